mod retry;

pub use retry::RetryPolicy;

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::cache::LookupCache;
use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::models::DeviceProfile;

const AUTH_HEADER: &str = "AuthToken";

/// Raw answer to a write call: status plus the unparsed body text
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Parsed body, or `None` for an empty (e.g. 204) or non-JSON body
    pub fn json(&self) -> Option<Value> {
        if self.body.trim().is_empty() {
            return None;
        }
        serde_json::from_str(&self.body).ok()
    }

    /// Success yields the parsed body; anything else becomes a write failure
    pub fn into_write_result(self) -> Result<Option<Value>> {
        if self.is_success() {
            Ok(self.json())
        } else {
            Err(ClientError::Write {
                status: self.status,
                body: self.body,
            })
        }
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Authenticated connection to the controller API
pub struct Session {
    api_root: String,
    username: String,
    password: String,
    token: Option<String>,
    client: Client,
    retry: RetryPolicy,
    device_profiles: LookupCache<String, DeviceProfile>,
    logical_devices: LookupCache<String, Value>,
    interface_maps: LookupCache<String, Value>,
}

impl Session {
    /// Build an unauthenticated session. `api_root` is the fixed API prefix,
    /// e.g. `https://10.0.0.1:443/api`.
    pub fn new(
        api_root: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        verify_tls: bool,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(!verify_tls)
            .build()?;

        Ok(Self {
            api_root: api_root.into().trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
            token: None,
            client,
            retry: RetryPolicy::default(),
            device_profiles: LookupCache::new(),
            logical_devices: LookupCache::new(),
            interface_maps: LookupCache::new(),
        })
    }

    /// Build a session from config and log in
    pub async fn connect(config: &Config) -> Result<Self> {
        let mut session = Self::new(
            config.api_root(),
            config.username.clone(),
            config.password.clone(),
            config.verify_tls,
            config.request_timeout(),
        )?
        .with_retry_policy(config.retry_policy());
        session.login().await?;
        Ok(session)
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.api_root, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, self.api_url(path))
            .header("Accept", "application/json");
        if let Some(token) = &self.token {
            builder = builder.header(AUTH_HEADER, token);
        }
        builder
    }

    /// Obtain and store the auth token
    pub async fn login(&mut self) -> Result<()> {
        let resp = self
            .request(Method::POST, "/aaa/login")
            .json(&LoginRequest {
                username: &self.username,
                password: &self.password,
            })
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ClientError::Auth(format!("login returned {}: {}", status, body)));
        }

        let token = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("token").and_then(Value::as_str).map(str::to_string))
            .ok_or_else(|| ClientError::Auth("login response carried no token".to_string()))?;

        tracing::info!(user = %self.username, "Logged in to controller");
        self.token = Some(token);
        Ok(())
    }

    /// End the session on the controller side
    pub async fn logout(self) -> Result<()> {
        let resp = self.post("/aaa/logout", &serde_json::json!({}), &[]).await?;
        if !resp.is_success() {
            tracing::warn!(status = %resp.status, "Logout returned {}", resp.body);
        } else {
            tracing::info!("Logged out of controller");
        }
        Ok(())
    }

    /// API version document; doubles as a connectivity check
    pub async fn version(&self) -> Result<Value> {
        self.get("/versions/api").await
    }

    pub async fn get(&self, path: &str) -> Result<Value> {
        let resp = self.request(Method::GET, path).send().await?;
        let status = resp.status();

        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::not_found("resource", path));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Status { status, body });
        }

        Ok(resp.json().await?)
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        params: &[(&str, &str)],
    ) -> Result<ApiResponse> {
        let resp = self
            .request(Method::POST, path)
            .query(params)
            .json(body)
            .send()
            .await?;
        read_response(resp).await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<ApiResponse> {
        let resp = self.request(Method::PUT, path).json(body).send().await?;
        read_response(resp).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
        let resp = self.request(Method::DELETE, path).send().await?;
        read_response(resp).await
    }

    /// Submit a PATCH, resubmitting the identical body while the controller
    /// answers 429. Non-2xx answers become `ClientError::Write`; an
    /// exhausted retry budget becomes `ClientError::RateLimited`.
    pub async fn patch_checked<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        params: &[(&str, &str)],
    ) -> Result<Option<Value>> {
        let resp = self.send_throttled(Method::PATCH, path, body, params).await?;
        if !resp.is_success() {
            tracing::error!(path, status = %resp.status, "PATCH failed: {}", resp.body);
        }
        resp.into_write_result()
    }

    /// Permissive form of [`Session::patch_checked`]: any failure is logged
    /// and reported as `None`, meaning the mutation may or may not have
    /// applied.
    pub async fn patch_throttled<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        params: &[(&str, &str)],
    ) -> Option<Value> {
        match self.patch_checked(path, body, params).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(path, "Throttled PATCH gave no result: {}", e);
                None
            }
        }
    }

    async fn send_throttled<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        params: &[(&str, &str)],
    ) -> Result<ApiResponse> {
        // Serialize once so every resubmission carries the same bytes
        let payload = serde_json::to_vec(body)?;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let resp = self
                .request(method.clone(), path)
                .query(params)
                .header("Content-Type", "application/json")
                .body(payload.clone())
                .send()
                .await?;

            if resp.status() != StatusCode::TOO_MANY_REQUESTS {
                return read_response(resp).await;
            }

            if !self.retry.allows_another(attempts) {
                tracing::error!(path, attempts, "Giving up on rate-limited request");
                return Err(ClientError::RateLimited { attempts });
            }

            let wait = self.retry.delay_for(attempts);
            tracing::warn!(
                path,
                attempt = attempts,
                wait_ms = wait.as_millis() as u64,
                "Controller rate limited the request, backing off"
            );
            tokio::time::sleep(wait).await;
        }
    }

    // --- Design catalog (memoized for the session lifetime) ---

    pub async fn device_profile(&self, id: &str) -> Result<DeviceProfile> {
        self.device_profiles
            .get_or_try_populate(id.to_string(), || self.fetch_device_profile(id))
            .await
    }

    async fn fetch_device_profile(&self, id: &str) -> Result<DeviceProfile> {
        let doc = self.get(&format!("/design/device-profiles/{}", id)).await?;
        Ok(serde_json::from_value(doc)?)
    }

    pub async fn logical_device(&self, id: &str) -> Result<Value> {
        self.logical_devices
            .get_or_try_populate(id.to_string(), || {
                self.get_owned(format!("/design/logical-devices/{}", id))
            })
            .await
    }

    pub async fn interface_map(&self, id: &str) -> Result<Value> {
        self.interface_maps
            .get_or_try_populate(id.to_string(), || {
                self.get_owned(format!("/design/interface-maps/{}", id))
            })
            .await
    }

    async fn get_owned(&self, path: String) -> Result<Value> {
        self.get(&path).await
    }
}

async fn read_response(resp: reqwest::Response) -> Result<ApiResponse> {
    let status = resp.status();
    let body = resp.text().await?;
    Ok(ApiResponse { status, body })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Mount a login endpoint and return a logged-in session against `server`
    pub async fn logged_in(server: &MockServer) -> Session {
        Mock::given(method("POST"))
            .and(path("/api/aaa/login"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!({"token": "tok-123", "id": "u1"})),
            )
            .mount(server)
            .await;

        let mut session = Session::new(
            format!("{}/api", server.uri()),
            "admin",
            "admin",
            false,
            Duration::from_secs(5),
        )
        .unwrap()
        .with_retry_policy(RetryPolicy {
            backoff: Duration::from_millis(10),
            multiplier: 1,
            max_backoff: Duration::from_millis(10),
            max_attempts: Some(5),
        });
        session.login().await.unwrap();
        session
    }
}
