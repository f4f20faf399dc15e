//! HCP REST implementation of [`IdentityProvider`].
//!
//! Authentication uses the OAuth2 client-credentials grant against the HCP
//! auth endpoint. Fetching the first token is the liveness check performed by
//! [`HttpProviderFactory::connect`]; later tokens are refreshed shortly before
//! they expire.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, trace};

use super::{
    CreatedKey, IamPolicy, IdentityProvider, PrincipalDetails, ProviderCredentials, ProviderError,
    ProviderFactory, ProviderResult, ServicePrincipal,
};
use crate::errors::{Error, Result};
use crate::types::SecretString;

const IAM_API_VERSION: &str = "iam/2019-12-10";
const RESOURCE_MANAGER_API_VERSION: &str = "resource-manager/2019-12-10";
const USER_AGENT: &str = concat!("hcp-secrets/", env!("CARGO_PKG_VERSION"));

/// Tokens are refreshed when they have less than this left.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(30);
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

/// Endpoints and transport settings for the HCP API
#[derive(Debug, Clone)]
pub struct HttpProviderConfig {
    pub api_address: String,
    pub auth_url: String,
    pub audience: String,
    /// Upper bound for every provider round-trip
    pub timeout: Duration,
}

impl Default for HttpProviderConfig {
    fn default() -> Self {
        Self {
            api_address: "https://api.cloud.hashicorp.com".to_string(),
            auth_url: "https://auth.idp.hashicorp.com/oauth2/token".to_string(),
            audience: "https://api.hashicorp.cloud".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Builds [`HcpIdentityProvider`] handles that share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpProviderFactory {
    config: HttpProviderConfig,
    http: Client,
}

impl HttpProviderFactory {
    pub fn new(config: HttpProviderConfig) -> Result<Self> {
        for (name, value) in [("api_address", &config.api_address), ("auth_url", &config.auth_url)] {
            url::Url::parse(value)
                .map_err(|e| Error::config(format!("Invalid HCP {} '{}': {}", name, value, e)))?;
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }
}

#[async_trait]
impl ProviderFactory for HttpProviderFactory {
    async fn connect(&self, credentials: &ProviderCredentials) -> Result<Arc<dyn IdentityProvider>> {
        let tokens = TokenSource {
            http: self.http.clone(),
            auth_url: self.config.auth_url.clone(),
            audience: self.config.audience.clone(),
            client_id: credentials.client_id.clone(),
            client_secret: credentials.client_secret.clone(),
            current: Mutex::new(None),
        };

        // Fetch a token to verify that the credential is usable
        tokens.bearer().await.map_err(|e| {
            tracing::error!(client_id = %credentials.client_id, error = %e, "HCP credential check failed");
            Error::authentication(format!("no valid credentials available: {}", e))
        })?;

        Ok(Arc::new(HcpIdentityProvider {
            http: self.http.clone(),
            api_address: self.config.api_address.trim_end_matches('/').to_string(),
            tokens,
        }))
    }
}

#[derive(Debug)]
struct AccessToken {
    value: SecretString,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

#[derive(Debug)]
struct TokenSource {
    http: Client,
    auth_url: String,
    audience: String,
    client_id: String,
    client_secret: SecretString,
    current: Mutex<Option<AccessToken>>,
}

impl TokenSource {
    async fn bearer(&self) -> ProviderResult<SecretString> {
        let mut current = self.current.lock().await;
        if let Some(token) = current.as_ref() {
            if token.expires_at > Instant::now() + TOKEN_REFRESH_MARGIN {
                return Ok(token.value.clone());
            }
        }

        let response = self
            .http
            .post(&self.auth_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose_secret()),
                ("audience", self.audience.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if matches!(status, StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(ProviderError::Unauthorized);
        }
        let response = check_status(response).await?;

        let token: TokenResponse =
            response.json().await.map_err(|e| ProviderError::decode(e.to_string()))?;
        let lifetime = match token.expires_in {
            0 => DEFAULT_TOKEN_LIFETIME,
            secs => Duration::from_secs(secs),
        };
        debug!(client_id = %self.client_id, lifetime_secs = lifetime.as_secs(), "Fetched HCP access token");

        let value = SecretString::new(token.access_token);
        *current = Some(AccessToken { value: value.clone(), expires_at: Instant::now() + lifetime });
        Ok(value)
    }
}

/// Identity provider backed by the HCP IAM and resource manager REST APIs.
#[derive(Debug)]
pub struct HcpIdentityProvider {
    http: Client,
    api_address: String,
    tokens: TokenSource,
}

#[derive(Deserialize)]
struct CallerIdentityResponse {
    principal: CallerPrincipal,
}

#[derive(Deserialize)]
struct CallerPrincipal {
    #[serde(default)]
    service: Option<ServicePrincipal>,
}

#[derive(Deserialize)]
struct ServicePrincipalResponse {
    service_principal: ServicePrincipal,
}

#[derive(Serialize)]
struct CreateServicePrincipalRequest<'a> {
    name: &'a str,
}

#[derive(Serialize, Deserialize)]
struct PolicyEnvelope {
    policy: IamPolicy,
}

impl HcpIdentityProvider {
    fn iam_url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.api_address, IAM_API_VERSION, path.trim_start_matches('/'))
    }

    fn policy_url(&self, project_id: &str, verb: &str) -> String {
        format!(
            "{}/{}/projects/{}:{}",
            self.api_address, RESOURCE_MANAGER_API_VERSION, project_id, verb
        )
    }

    async fn send(&self, request: RequestBuilder) -> ProviderResult<Response> {
        let token = self.tokens.bearer().await?;
        let response = request.bearer_auth(token.expose_secret()).send().await?;
        check_status(response).await
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ProviderResult<T> {
        let response = self.send(request).await?;
        response.json::<T>().await.map_err(|e| ProviderError::decode(e.to_string()))
    }
}

async fn check_status(response: Response) -> ProviderResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ProviderError::Unauthorized);
    }

    let body = response.text().await.unwrap_or_default();
    trace!(status = status.as_u16(), body = %body, "HCP request failed");
    Err(ProviderError::status(status.as_u16(), body))
}

#[async_trait]
impl IdentityProvider for HcpIdentityProvider {
    async fn whoami(&self) -> ProviderResult<ServicePrincipal> {
        let url = self.iam_url("caller-identity");
        let identity: CallerIdentityResponse = self.send_json(self.http.get(&url)).await?;
        identity
            .principal
            .service
            .ok_or_else(|| ProviderError::decode("caller identity is not a service principal"))
    }

    async fn create_principal(&self, parent: &str, name: &str) -> ProviderResult<ServicePrincipal> {
        let url = self.iam_url(&format!("{}/service-principals", parent));
        debug!(parent = %parent, name = %name, "Creating service principal");
        let created: ServicePrincipalResponse = self
            .send_json(self.http.post(&url).json(&CreateServicePrincipalRequest { name }))
            .await?;
        Ok(created.service_principal)
    }

    async fn delete_principal(&self, resource_name: &str) -> ProviderResult<()> {
        let url = self.iam_url(resource_name);
        self.send(self.http.delete(&url)).await?;
        Ok(())
    }

    async fn get_principal(&self, resource_name: &str) -> ProviderResult<PrincipalDetails> {
        let url = self.iam_url(resource_name);
        self.send_json(self.http.get(&url)).await
    }

    async fn create_key(&self, principal_resource_name: &str) -> ProviderResult<CreatedKey> {
        let url = self.iam_url(&format!("{}/keys", principal_resource_name));
        self.send_json(self.http.post(&url).json(&serde_json::json!({}))).await
    }

    async fn delete_key(&self, key_resource_name: &str) -> ProviderResult<()> {
        let url = self.iam_url(key_resource_name);
        self.send(self.http.delete(&url)).await?;
        Ok(())
    }

    async fn get_iam_policy(&self, project_id: &str) -> ProviderResult<IamPolicy> {
        let url = self.policy_url(project_id, "getIamPolicy");
        let envelope: PolicyEnvelope = self.send_json(self.http.get(&url)).await?;
        Ok(envelope.policy)
    }

    async fn set_iam_policy(&self, project_id: &str, policy: &IamPolicy) -> ProviderResult<IamPolicy> {
        let url = self.policy_url(project_id, "setIamPolicy");
        let body = PolicyEnvelope { policy: policy.clone() };
        let envelope: PolicyEnvelope = self.send_json(self.http.put(&url).json(&body)).await?;
        Ok(envelope.policy)
    }
}
