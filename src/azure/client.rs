use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::config::AzureConfig;
use crate::error::{EstimatorError, Result};
use crate::utils::http::read_json;
use crate::utils::retry::retry_default;

/// Guard against a `nextLink` that never terminates
const MAX_PAGES: usize = 1000;

/// One page of an ARM list response
#[derive(Debug, Deserialize)]
pub struct ArmPage<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "nextLink", default)]
    pub next_link: Option<String>,
}

/// Treat an explicit JSON `null` like a missing field
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy)]
enum Verb {
    Get,
    Post,
}

/// Authenticated Azure Resource Manager client
#[derive(Debug, Clone)]
pub struct ArmClient {
    http: reqwest::Client,
    token: String,
    azure: AzureConfig,
}

impl ArmClient {
    pub fn new(http: reqwest::Client, token: String, azure: AzureConfig) -> Self {
        Self { http, token, azure }
    }

    pub fn config(&self) -> &AzureConfig {
        &self.azure
    }

    /// Absolute URL for an ARM path with the given query parameters
    pub fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let raw = format!(
            "{}{}",
            self.azure.management_endpoint.trim_end_matches('/'),
            path
        );
        let mut url = Url::parse(&raw)
            .map_err(|e| EstimatorError::Config(format!("invalid ARM URL {}: {}", raw, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    async fn send_once<T: DeserializeOwned>(&self, verb: Verb, url: &str) -> Result<T> {
        let request = match verb {
            Verb::Get => self.http.get(url),
            Verb::Post => self.http.post(url).json(&serde_json::json!({})),
        };
        let response = request.bearer_auth(&self.token).send().await?;
        read_json(response).await
    }

    async fn send<T: DeserializeOwned>(&self, verb: Verb, url: &str) -> Result<T> {
        retry_default("ARM request", || self.send_once(verb, url)).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        self.send(Verb::Get, url.as_str()).await
    }

    /// Visit every page of a list, stopping early when `visit` returns false
    async fn pages<T, F>(&self, verb: Verb, url: &Url, mut visit: F) -> Result<()>
    where
        T: DeserializeOwned,
        F: FnMut(Vec<T>) -> bool,
    {
        let mut next = url.to_string();
        for _ in 0..MAX_PAGES {
            let page: ArmPage<T> = self.send(verb, &next).await?;
            if !visit(page.value) {
                return Ok(());
            }
            match page.next_link {
                Some(link) if !link.is_empty() => next = link,
                _ => return Ok(()),
            }
        }

        tracing::warn!(url = %url, pages = MAX_PAGES, "Stopped following ARM nextLink");
        Ok(())
    }

    pub async fn get_pages<T, F>(&self, url: &Url, visit: F) -> Result<()>
    where
        T: DeserializeOwned,
        F: FnMut(Vec<T>) -> bool,
    {
        self.pages(Verb::Get, url, visit).await
    }

    /// Every item of a GET list
    pub async fn get_all<T: DeserializeOwned>(&self, url: &Url) -> Result<Vec<T>> {
        let mut items = Vec::new();
        self.get_pages(url, |mut page: Vec<T>| {
            items.append(&mut page);
            true
        })
        .await?;
        Ok(items)
    }

    /// Every item of a POST list such as `getEntities`
    pub async fn post_all<T: DeserializeOwned>(&self, url: &Url) -> Result<Vec<T>> {
        let mut items = Vec::new();
        self.pages(Verb::Post, url, |mut page: Vec<T>| {
            items.append(&mut page);
            true
        })
        .await?;
        Ok(items)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) fn client_for(server: &MockServer) -> ArmClient {
        let azure = AzureConfig {
            management_endpoint: server.uri(),
            ..AzureConfig::default()
        };
        ArmClient::new(reqwest::Client::new(), "test-token".to_string(), azure)
    }

    #[test]
    fn test_url_encodes_query() {
        let azure = AzureConfig {
            management_endpoint: "https://arm.example/".to_string(),
            ..AzureConfig::default()
        };
        let client = ArmClient::new(reqwest::Client::new(), String::new(), azure);
        let url = client
            .url("/subscriptions", &[("api-version", "2022-12-01"), ("$filter", "a eq 'b'")])
            .unwrap();
        assert!(url.as_str().starts_with("https://arm.example/subscriptions?api-version=2022-12-01"));
        let filter = url.query_pairs().find(|(k, _)| k == "$filter").unwrap().1;
        assert_eq!(filter, "a eq 'b'");
    }

    #[tokio::test]
    async fn test_get_all_follows_next_link() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/items"))
            .and(query_param("api-version", "1"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [1, 2],
                "nextLink": format!("{}/items-page-2", server.uri())
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/items-page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": [3]})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let url = client.url("/items", &[("api-version", "1")]).unwrap();
        let items: Vec<u32> = client.get_all(&url).await.unwrap();
        assert_eq!(items, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_forbidden_is_an_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("AuthorizationFailed"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let url = client.url("/items", &[]).unwrap();
        let err = client.get_all::<u32>(&url).await.unwrap_err();
        assert!(matches!(err, EstimatorError::Api { status: 403, .. }));
    }

    #[derive(Deserialize)]
    struct Tagged {
        #[serde(default, deserialize_with = "null_as_default")]
        tags: std::collections::BTreeMap<String, String>,
    }

    #[test]
    fn test_null_as_default() {
        let tagged: Tagged = serde_json::from_str(r#"{"tags": null}"#).unwrap();
        assert!(tagged.tags.is_empty());
        let tagged: Tagged = serde_json::from_str("{}").unwrap();
        assert!(tagged.tags.is_empty());
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Named {
        name: String,
    }

    fn parse_page<T: DeserializeOwned>(body: &str) -> ArmPage<T> {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_page_items_need_not_be_default() {
        let page: ArmPage<Named> = parse_page(r#"{"nextLink": "https://next"}"#);
        assert!(page.value.is_empty());
        assert_eq!(page.next_link.as_deref(), Some("https://next"));

        let page: ArmPage<Named> = parse_page(r#"{"value": [{"name": "a"}]}"#);
        assert_eq!(page.value, vec![Named { name: "a".to_string() }]);
        assert!(page.next_link.is_none());
    }
}
