use std::collections::BTreeMap;

/// Locations that do not pin a resource to a region
const NON_REGIONAL_LOCATIONS: [&str; 2] = ["global", ""];

/// Normalize an Azure location: "East US" and "eastus" both become `eastus`
pub fn normalize_region(location: &str) -> String {
    location
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Most frequent regional location among a subscription's resources.
/// Ties go to the alphabetically first region.
pub fn primary_region(locations: &BTreeMap<String, u64>) -> Option<String> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for (location, count) in locations {
        let region = normalize_region(location);
        if NON_REGIONAL_LOCATIONS.contains(&region.as_str()) {
            continue;
        }
        *counts.entry(region).or_default() += count;
    }

    let mut best: Option<(String, u64)> = None;
    for (region, count) in counts {
        match &best {
            Some((_, best_count)) if *best_count >= count => {}
            _ => best = Some((region, count)),
        }
    }
    best.map(|(region, _)| region)
}
