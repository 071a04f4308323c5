use serde::Deserialize;
use std::fmt;

use crate::config::AzureConfig;
use crate::error::{EstimatorError, Result};

/// Resource every ARM token is issued for
pub const ARM_RESOURCE: &str = "https://management.azure.com/";
const ARM_SCOPE: &str = "https://management.azure.com/.default";

/// Where the ARM bearer token comes from
#[derive(Clone, PartialEq)]
pub enum Credential {
    /// Pre-issued token from `AZURE_ACCESS_TOKEN`
    StaticToken(String),
    /// Service principal via the client-credential flow
    ClientSecret {
        tenant_id: String,
        client_id: String,
        client_secret: String,
    },
    /// `az account get-access-token`
    AzureCli,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::StaticToken(_) => write!(f, "StaticToken(..)"),
            Credential::ClientSecret {
                tenant_id,
                client_id,
                ..
            } => f
                .debug_struct("ClientSecret")
                .field("tenant_id", tenant_id)
                .field("client_id", client_id)
                .finish_non_exhaustive(),
            Credential::AzureCli => write!(f, "AzureCli"),
        }
    }
}

impl Credential {
    /// Pick a credential: explicit token, then service principal, then the az CLI
    pub fn detect<F>(lookup: F) -> Credential
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(token) = var("AZURE_ACCESS_TOKEN") {
            return Credential::StaticToken(token);
        }

        if let (Some(tenant_id), Some(client_id), Some(client_secret)) = (
            var("AZURE_TENANT_ID"),
            var("AZURE_CLIENT_ID"),
            var("AZURE_CLIENT_SECRET"),
        ) {
            return Credential::ClientSecret {
                tenant_id,
                client_id,
                client_secret,
            };
        }

        Credential::AzureCli
    }

    pub fn from_env() -> Credential {
        Self::detect(|name| std::env::var(name).ok())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Credential::StaticToken(_) => "access token",
            Credential::ClientSecret { .. } => "client secret",
            Credential::AzureCli => "azure cli",
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    access_token: String,
}

/// Obtain an ARM bearer token. Any failure here is fatal for the run.
pub async fn acquire_token(
    credential: &Credential,
    http: &reqwest::Client,
    azure: &AzureConfig,
) -> Result<String> {
    tracing::info!(method = credential.kind(), "Authenticating to Azure");

    let token = match credential {
        Credential::StaticToken(token) => token.clone(),
        Credential::ClientSecret {
            tenant_id,
            client_id,
            client_secret,
        } => client_secret_token(http, azure, tenant_id, client_id, client_secret).await?,
        Credential::AzureCli => cli_token().await?,
    };

    if token.trim().is_empty() {
        return Err(EstimatorError::Auth("received an empty access token".to_string()));
    }
    Ok(token)
}

async fn client_secret_token(
    http: &reqwest::Client,
    azure: &AzureConfig,
    tenant_id: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<String> {
    let url = format!(
        "{}/{}/oauth2/v2.0/token",
        azure.login_endpoint.trim_end_matches('/'),
        tenant_id
    );
    let form = [
        ("grant_type", "client_credentials"),
        ("client_id", client_id),
        ("client_secret", client_secret),
        ("scope", ARM_SCOPE),
    ];

    let response = http
        .post(&url)
        .form(&form)
        .send()
        .await
        .map_err(|e| EstimatorError::Auth(format!("token request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(EstimatorError::Auth(format!(
            "token endpoint returned {}: {}",
            status.as_u16(),
            body.chars().take(300).collect::<String>()
        )));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| EstimatorError::Auth(format!("malformed token response: {}", e)))?;
    Ok(token.access_token)
}

async fn cli_token() -> Result<String> {
    let output = tokio::process::Command::new("az")
        .args([
            "account",
            "get-access-token",
            "--resource",
            ARM_RESOURCE,
            "--output",
            "json",
        ])
        .output()
        .await
        .map_err(|e| EstimatorError::Auth(format!("could not run the az CLI: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(EstimatorError::Auth(format!(
            "az account get-access-token failed: {}",
            stderr.trim()
        )));
    }

    let token: CliToken = serde_json::from_slice(&output.stdout)
        .map_err(|e| EstimatorError::Auth(format!("unexpected az CLI output: {}", e)))?;
    Ok(token.access_token)
}
