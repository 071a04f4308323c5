use crate::error::{EstimatorError, Result};
use serde::de::DeserializeOwned;
use std::time::Duration;

const BODY_EXCERPT_LEN: usize = 512;

/// Shared HTTP client for ARM, token and pricing endpoints
pub fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .user_agent(concat!("azcost/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Decode a JSON body, turning non-success statuses into `EstimatorError::Api`
pub async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let url = response.url().to_string();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(EstimatorError::Api {
            status: status.as_u16(),
            url,
            body: excerpt(&body),
        });
    }

    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn excerpt(body: &str) -> String {
    if body.len() <= BODY_EXCERPT_LEN {
        return body.to_string();
    }
    let mut end = BODY_EXCERPT_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
