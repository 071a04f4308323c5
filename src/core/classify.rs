use std::collections::BTreeMap;

use crate::billing::MatchSource;
use crate::config::{ClassificationConfig, ClassificationRule};

/// Outcome of classifying one subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub label: String,
    pub source: MatchSource,
}

/// Rule-based labeller for one dimension (environment or business unit)
#[derive(Debug, Clone)]
pub struct Classifier {
    tag_key: String,
    default_label: String,
    rules: Vec<ClassificationRule>,
    /// Use an unmatched, non-empty tag value as the label itself
    tag_passthrough: bool,
}

impl Classifier {
    pub fn new(
        tag_key: &str,
        default_label: &str,
        rules: &[ClassificationRule],
        tag_passthrough: bool,
    ) -> Self {
        let mut rules = rules.to_vec();
        // Highest priority first, name breaks ties so rule order never matters
        rules.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.name.cmp(&b.name)));
        for rule in &mut rules {
            rule.name_patterns = rule
                .name_patterns
                .iter()
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect();
            // Values stay case-sensitive, only surrounding whitespace goes
            rule.tag_values = rule
                .tag_values
                .iter()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect();
        }

        Self {
            tag_key: tag_key.to_string(),
            default_label: default_label.to_string(),
            rules,
            tag_passthrough,
        }
    }

    pub fn environments(config: &ClassificationConfig) -> Self {
        Self::new(
            &config.environment_tag,
            &config.default_environment,
            &config.environments,
            false,
        )
    }

    pub fn business_units(config: &ClassificationConfig) -> Self {
        Self::new(
            &config.business_unit_tag,
            &config.default_business_unit,
            &config.business_units,
            true,
        )
    }

    pub fn classify(&self, name: &str, tags: &BTreeMap<String, String>) -> Classification {
        let tag_value = tags.get(&self.tag_key).map(|v| v.trim());

        if let Some(value) = tag_value.filter(|v| !v.is_empty()) {
            if let Some(rule) = self
                .rules
                .iter()
                .find(|rule| rule.tag_values.iter().any(|tv| tv == value))
            {
                return Self::matched(&rule.name, MatchSource::Tag);
            }
            if self.tag_passthrough {
                return Self::matched(value, MatchSource::Tag);
            }
        }

        let lowered = name.to_lowercase();
        if let Some(rule) = self
            .rules
            .iter()
            .find(|rule| rule.name_patterns.iter().any(|p| lowered.contains(p.as_str())))
        {
            return Self::matched(&rule.name, MatchSource::Name);
        }

        Self::matched(&self.default_label, MatchSource::Default)
    }

    fn matched(label: &str, source: MatchSource) -> Classification {
        Classification {
            label: label.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_environment_rules;

    fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn environments() -> Classifier {
        Classifier::environments(&ClassificationConfig::default())
    }

    #[test]
    fn test_preprod_outranks_prod() {
        let result = environments().classify("contoso-preprod-01", &BTreeMap::new());
        assert_eq!(result.label, "PreProduction");
        assert_eq!(result.source, MatchSource::Name);

        let result = environments().classify("Contoso PROD", &BTreeMap::new());
        assert_eq!(result.label, "Production");
    }

    #[test]
    fn test_tag_beats_name() {
        let result = environments().classify(
            "payments-dev",
            &tags(&[("Environment", "Production")]),
        );
        assert_eq!(result.label, "Production");
        assert_eq!(result.source, MatchSource::Tag);
    }

    #[test]
    fn test_tag_value_is_case_sensitive() {
        // "PRODUCTION" is not a configured tag value, so the name decides
        let result = environments().classify(
            "payments-sandbox",
            &tags(&[("Environment", "PRODUCTION")]),
        );
        assert_eq!(result.label, "Development");
        assert_eq!(result.source, MatchSource::Name);

        // Tag key must match exactly too
        let result = environments().classify("payments", &tags(&[("environment", "Production")]));
        assert_eq!(result.source, MatchSource::Default);
    }

    #[test]
    fn test_default_when_nothing_matches() {
        let result = environments().classify("contoso-billing", &BTreeMap::new());
        assert_eq!(result.label, "Unclassified");
        assert_eq!(result.source, MatchSource::Default);
    }

    #[test]
    fn test_independent_of_rule_order() {
        let rules = default_environment_rules();
        let mut reversed = rules.clone();
        reversed.reverse();
        let forward = Classifier::new("Environment", "Unclassified", &rules, false);
        let backward = Classifier::new("Environment", "Unclassified", &reversed, false);

        for name in [
            "prod-shared-hub",
            "dev-test",
            "uat-live",
            "qa sandbox",
            "corp-identity",
            "nothing-here",
        ] {
            assert_eq!(
                forward.classify(name, &BTreeMap::new()),
                backward.classify(name, &BTreeMap::new()),
                "{}",
                name
            );
        }
    }

    #[test]
    fn test_equal_priority_breaks_ties_by_name() {
        let rule = |name: &str| ClassificationRule {
            name: name.to_string(),
            priority: 10,
            name_patterns: vec!["data".to_string()],
            tag_values: vec![],
        };
        let a = Classifier::new("BU", "Unassigned", &[rule("Research"), rule("Analytics")], true);
        let b = Classifier::new("BU", "Unassigned", &[rule("Analytics"), rule("Research")], true);
        assert_eq!(a.classify("data-lake", &BTreeMap::new()).label, "Analytics");
        assert_eq!(b.classify("data-lake", &BTreeMap::new()).label, "Analytics");
    }

    #[test]
    fn test_business_unit_tag_passthrough() {
        let mut config = ClassificationConfig::default();
        config.business_units = vec![ClassificationRule {
            name: "Finance".to_string(),
            priority: 10,
            name_patterns: vec!["fin".to_string()],
            tag_values: vec!["FIN".to_string()],
        }];
        let classifier = Classifier::business_units(&config);

        let mapped = classifier.classify("anything", &tags(&[("BusinessUnit", "FIN")]));
        assert_eq!(mapped.label, "Finance");

        let passed = classifier.classify("fin-core", &tags(&[("BusinessUnit", " Ops ")]));
        assert_eq!(passed.label, "Ops");
        assert_eq!(passed.source, MatchSource::Tag);

        let by_name = classifier.classify("fin-core", &tags(&[("BusinessUnit", "")]));
        assert_eq!(by_name.label, "Finance");
        assert_eq!(by_name.source, MatchSource::Name);

        let fallback = classifier.classify("core", &BTreeMap::new());
        assert_eq!(fallback.label, "Unassigned");
    }

    #[test]
    fn test_configured_tag_values_are_trimmed() {
        let rules = vec![ClassificationRule {
            name: "Production".to_string(),
            priority: 100,
            name_patterns: vec![],
            tag_values: vec!["Production ".to_string(), " ".to_string()],
        }];
        let classifier = Classifier::new("Environment", "Unclassified", &rules, false);

        let result = classifier.classify("payments", &tags(&[("Environment", "Production")]));
        assert_eq!(result.label, "Production");
        assert_eq!(result.source, MatchSource::Tag);

        let result = classifier.classify("payments", &tags(&[("Environment", " Production")]));
        assert_eq!(result.source, MatchSource::Tag);

        // Case still matters after trimming
        let result = classifier.classify("payments", &tags(&[("Environment", "production")]));
        assert_eq!(result.source, MatchSource::Default);
    }
}
