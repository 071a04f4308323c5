use chrono::Utc;
use serde::Deserialize;
use std::collections::BTreeMap;

use super::pricing::query_key;
use super::{Meter, PricingSnapshot};
use crate::config::{Config, MeterFilter, MeterFilters};
use crate::core::region::normalize_region;
use crate::error::{EstimatorError, Result};
use crate::utils::http::read_json;
use crate::utils::retry::retry_default;

/// Upper bound on pages followed for a single meter
const MAX_PAGES_PER_METER: usize = 50;

/// One page of the Azure Retail Prices API
#[derive(Debug, Deserialize)]
pub struct RetailPage {
    #[serde(rename = "Items", default)]
    pub items: Vec<RetailPrice>,
    #[serde(rename = "NextPageLink", default)]
    pub next_page_link: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetailPrice {
    #[serde(default)]
    pub currency_code: String,
    #[serde(default)]
    pub tier_minimum_units: f64,
    pub retail_price: f64,
    #[serde(default)]
    pub arm_region_name: String,
    #[serde(default)]
    pub meter_name: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub sku_name: String,
    #[serde(default)]
    pub service_name: String,
    #[serde(default)]
    pub unit_of_measure: String,
}

impl MeterFilters {
    pub fn get(&self, meter: Meter) -> &MeterFilter {
        match meter {
            Meter::ThroughputUnit => &self.throughput_unit,
            Meter::Storage => &self.storage,
            Meter::ComputeInstance => &self.compute_instance,
            Meter::SecretOperations => &self.secret_operations,
            Meter::PrivateEndpoint => &self.private_endpoint,
            Meter::Gateway => &self.gateway,
        }
    }
}

/// Units the internal price of a meter is expressed in
fn billed_quantity(meter: Meter) -> f64 {
    match meter {
        Meter::SecretOperations => 10_000.0,
        _ => 1.0,
    }
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// OData `$filter` expression selecting consumption prices of one meter
pub fn build_filter(filter: &MeterFilter) -> String {
    let mut clauses = vec![
        format!("serviceName eq {}", quote(&filter.service_name)),
        format!("meterName eq {}", quote(&filter.meter_name)),
        "priceType eq 'Consumption'".to_string(),
    ];
    if let Some(product) = &filter.product_name {
        clauses.push(format!("productName eq {}", quote(product)));
    }
    if let Some(sku) = &filter.sku_name {
        clauses.push(format!("skuName eq {}", quote(sku)));
    }
    clauses.join(" and ")
}

/// Leading quantity of a unit of measure: "10K" is 10,000, "1 Hour" is 1
pub fn unit_quantity(unit_of_measure: &str) -> f64 {
    let trimmed = unit_of_measure.trim();
    let number_end = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let base: f64 = match trimmed[..number_end].parse() {
        Ok(value) if value > 0.0 => value,
        _ => return 1.0,
    };

    let multiplier = match trimmed[number_end..].chars().next() {
        Some('K') => 1_000.0,
        Some('M') => 1_000_000.0,
        _ => 1.0,
    };
    base * multiplier
}

/// Lowest-tier positive price per normalized region
pub fn select_prices(items: &[RetailPrice], meter: Meter) -> BTreeMap<String, f64> {
    let mut best: BTreeMap<String, (f64, f64)> = BTreeMap::new();

    for item in items {
        if item.retail_price <= 0.0 {
            continue;
        }
        let region = normalize_region(&item.arm_region_name);
        if region.is_empty() {
            continue;
        }

        let price = item.retail_price / unit_quantity(&item.unit_of_measure) * billed_quantity(meter);
        let candidate = (item.tier_minimum_units, price);
        match best.get(&region) {
            Some(current) if *current <= candidate => {}
            _ => {
                best.insert(region, candidate);
            }
        }
    }

    best.into_iter()
        .map(|(region, (_, price))| (region, price))
        .collect()
}

async fn fetch_page(http: &reqwest::Client, request: &PageRequest<'_>) -> Result<RetailPage> {
    let builder = match request {
        PageRequest::First {
            url,
            currency,
            filter,
        } => http.get(*url).query(&[
            ("currencyCode", quote(currency).as_str()),
            ("$filter", filter.as_str()),
        ]),
        PageRequest::Next(url) => http.get(*url),
    };
    read_json(builder.send().await?).await
}

enum PageRequest<'a> {
    First {
        url: &'a str,
        currency: &'a str,
        filter: String,
    },
    Next(&'a str),
}

/// Every price item of one meter, following `NextPageLink`
pub async fn fetch_meter_items(
    http: &reqwest::Client,
    endpoint: &str,
    currency: &str,
    filter: &MeterFilter,
) -> Result<Vec<RetailPrice>> {
    let url = format!("{}/api/retail/prices", endpoint.trim_end_matches('/'));
    let mut items = Vec::new();

    let first = PageRequest::First {
        url: &url,
        currency,
        filter: build_filter(filter),
    };
    let mut page = retry_default("retail price query", || fetch_page(http, &first)).await?;

    for _ in 1..MAX_PAGES_PER_METER {
        items.append(&mut page.items);
        let next = match page.next_page_link.take() {
            Some(next) if !next.is_empty() => next,
            _ => return Ok(items),
        };
        let request = PageRequest::Next(&next);
        page = retry_default("retail price page", || fetch_page(http, &request)).await?;
    }

    items.append(&mut page.items);
    tracing::warn!(
        meter = %filter.meter_name,
        pages = MAX_PAGES_PER_METER,
        "Stopped following retail price pages"
    );
    Ok(items)
}

/// Fetch a complete snapshot from the Retail Prices API.
/// Fails if any meter query fails or nothing priced comes back.
pub async fn fetch_snapshot(http: &reqwest::Client, config: &Config) -> Result<PricingSnapshot> {
    let endpoint = &config.azure.pricing_endpoint;
    let currency = &config.pricing.currency;
    let mut fetched: BTreeMap<String, BTreeMap<Meter, f64>> = BTreeMap::new();

    for meter in Meter::ALL {
        let filter = config.pricing.meters.get(meter);
        let items = fetch_meter_items(http, endpoint, currency, filter).await?;
        let prices = select_prices(&items, meter);
        tracing::debug!(
            ?meter,
            items = items.len(),
            regions = prices.len(),
            "Fetched retail prices"
        );
        if prices.is_empty() {
            tracing::warn!(?meter, meter_name = %filter.meter_name, "No retail prices for meter");
        }

        for (region, price) in prices {
            fetched.entry(region).or_default().insert(meter, price);
        }
    }

    if fetched.is_empty() {
        return Err(EstimatorError::Pricing(
            "Retail Prices API returned no usable prices".to_string(),
        ));
    }

    tracing::info!(regions = fetched.len(), "Fetched retail pricing");
    let mut snapshot = PricingSnapshot::from_fetched(
        fetched,
        &config.pricing.default_region,
        currency,
        Utc::now(),
    );
    snapshot.query_key = query_key(&config.pricing);
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::PricingSource;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn item(region: &str, tier: f64, price: f64, unit: &str) -> RetailPrice {
        RetailPrice {
            currency_code: "USD".to_string(),
            tier_minimum_units: tier,
            retail_price: price,
            arm_region_name: region.to_string(),
            meter_name: String::new(),
            product_name: String::new(),
            sku_name: String::new(),
            service_name: String::new(),
            unit_of_measure: unit.to_string(),
        }
    }

    #[test]
    fn test_build_filter_escapes_quotes() {
        let filter = MeterFilter {
            service_name: "Event Hubs".to_string(),
            meter_name: "Standard Throughput Unit".to_string(),
            product_name: None,
            sku_name: Some("O'Brien".to_string()),
        };
        assert_eq!(
            build_filter(&filter),
            "serviceName eq 'Event Hubs' and meterName eq 'Standard Throughput Unit' \
             and priceType eq 'Consumption' and skuName eq 'O''Brien'"
        );
    }

    #[test]
    fn test_unit_quantity() {
        assert_eq!(unit_quantity("1 Hour"), 1.0);
        assert_eq!(unit_quantity("10K"), 10_000.0);
        assert_eq!(unit_quantity("100 Hours"), 100.0);
        assert_eq!(unit_quantity("1 GB/Month"), 1.0);
        assert_eq!(unit_quantity("Hours"), 1.0);
    }

    #[test]
    fn test_select_prices_takes_lowest_tier() {
        let items = vec![
            item("eastus", 51200.0, 0.015, "1 GB/Month"),
            item("eastus", 0.0, 0.0184, "1 GB/Month"),
            item("West Europe", 0.0, 0.02, "1 GB/Month"),
            item("westus", 0.0, 0.0, "1 GB/Month"),
            item("", 0.0, 0.5, "1 GB/Month"),
        ];
        let prices = select_prices(&items, Meter::Storage);
        assert_eq!(prices.len(), 2);
        assert_eq!(prices["eastus"], 0.0184);
        assert_eq!(prices["westeurope"], 0.02);
    }

    #[test]
    fn test_select_prices_normalizes_units() {
        let items = vec![item("eastus", 0.0, 3.0, "1M")];
        let prices = select_prices(&items, Meter::SecretOperations);
        assert!((prices["eastus"] - 0.03).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_fetch_snapshot_follows_pages() {
        let server = MockServer::start().await;
        let mut config = Config::default();
        config.azure.pricing_endpoint = server.uri();

        let throughput_filter = build_filter(&config.pricing.meters.throughput_unit);
        Mock::given(method("GET"))
            .and(path("/api/retail/prices"))
            .and(query_param("$filter", throughput_filter.as_str()))
            .and(query_param("currencyCode", "'USD'"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Items": [
                    {"retailPrice": 0.031, "armRegionName": "eastus", "tierMinimumUnits": 0.0, "unitOfMeasure": "1 Hour"}
                ],
                "NextPageLink": format!("{}/retail/next", server.uri())
            })))
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/retail/next"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Items": [
                    {"retailPrice": 0.036, "armRegionName": "westeurope", "tierMinimumUnits": 0.0, "unitOfMeasure": "1 Hour"}
                ],
                "NextPageLink": null
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/retail/prices"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"Items": [], "NextPageLink": null})),
            )
            .with_priority(10)
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let snapshot = fetch_snapshot(&http, &config).await.unwrap();

        assert_eq!(snapshot.source, PricingSource::Retail);
        assert_eq!(snapshot.default.throughput_unit_hour, 0.031);
        assert_eq!(snapshot.lookup("westeurope").throughput_unit_hour, 0.036);
        assert_eq!(
            snapshot.lookup("westeurope").gateway_hour,
            snapshot.default.gateway_hour
        );
    }

    #[tokio::test]
    async fn test_fetch_snapshot_without_prices_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/retail/prices"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Items": []})))
            .mount(&server)
            .await;

        let mut config = Config::default();
        config.azure.pricing_endpoint = server.uri();

        let err = fetch_snapshot(&reqwest::Client::new(), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, EstimatorError::Pricing(_)));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/retail/prices"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad filter"))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = Config::default();
        config.azure.pricing_endpoint = server.uri();

        let err = fetch_snapshot(&reqwest::Client::new(), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, EstimatorError::Api { status: 400, .. }));
    }
}
