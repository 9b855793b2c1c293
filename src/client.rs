use crate::{
    error::{
        Error,
        Result,
    },
    model::{
        ApiResponse,
        LoginData,
        ServerStats,
        ServerSummary,
    },
};
use crafty_exporter_config::InstanceConfig;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::OnceCell;
use url::Url;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Client for the v2 REST API of a single Crafty instance.
///
/// The bearer token is requested on first use and kept for the lifetime of the client. A failed login is not cached,
/// so the next call tries again.
#[derive(Debug)]
pub struct CraftyClient {
    hostname: String,
    username: String,
    password: String,
    base_url: Url,
    http: reqwest::Client,
    token: OnceCell<String>,
}

impl CraftyClient {
    pub fn new(config: &InstanceConfig, timeout: Duration) -> Result<Self> {
        let base_url = config.api_base_url().map_err(|source| Error::InvalidUrl {
            host: config.hostname.clone(),
            source,
        })?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|source| Error::Fetch {
                url: base_url.to_string(),
                source,
            })?;

        Ok(Self {
            hostname: config.hostname.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            base_url,
            http,
            token: OnceCell::new(),
        })
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    /// Bearer token for this instance, logging in if none is cached yet.
    pub async fn authenticate(&self) -> Result<&str> {
        self.token.get_or_try_init(|| self.login()).await.map(String::as_str)
    }

    async fn login(&self) -> Result<String> {
        let url = self.endpoint("auth/login");
        debug!(host = %self.hostname, %url, "authenticating");

        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({
                "username": self.username,
                "password": self.password,
            }))
            .send()
            .await
            .map_err(|source| Error::Fetch { url, source })?;

        let http_status = response.status();
        let ApiResponse { status, data } =
            response
                .json::<ApiResponse<LoginData>>()
                .await
                .map_err(|err| Error::Auth {
                    host: self.hostname.clone(),
                    reason: format!("malformed login response (HTTP {http_status}): {err}"),
                })?;

        data.and_then(|data| data.token)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| Error::Auth {
                host: self.hostname.clone(),
                reason: format!("no token in login response (HTTP {http_status}, status {status:?})"),
            })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>> {
        let token = self.authenticate().await?;
        let url = self.endpoint(path);
        trace!(host = %self.hostname, %url, "GET");

        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match response {
            Ok(response) => response.json().await.map_err(|source| Error::Fetch { url, source }),
            Err(source) => Err(Error::Fetch { url, source }),
        }
    }

    /// `GET /servers`
    pub async fn list_servers(&self) -> Result<ApiResponse<Vec<ServerSummary>>> {
        self.get("servers").await
    }

    /// `GET /servers/{id}/stats`
    pub async fn get_server_stats(&self, server_id: &str) -> Result<ApiResponse<ServerStats>> {
        self.get(&format!("servers/{server_id}/stats")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::{
        matchers::{
            body_json,
            header,
            method,
            path,
        },
        Mock,
        MockServer,
        ResponseTemplate,
    };

    fn client_for(server: &MockServer, timeout: Duration) -> CraftyClient {
        let mut config = InstanceConfig::new("crafty.test", "exporter", "secret");
        config.base_url = Some(Url::parse(&format!("{}/api/v2", server.uri())).unwrap());
        CraftyClient::new(&config, timeout).unwrap()
    }

    async fn mount_login(server: &MockServer, body: serde_json::Value, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/api/v2/auth/login"))
            .and(body_json(json!({"username": "exporter", "password": "secret"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn token_is_fetched_once() {
        let server = MockServer::start().await;
        mount_login(&server, json!({"status": "ok", "data": {"token": "abc"}}), 1).await;

        let client = client_for(&server, Duration::from_secs(5));
        assert_eq!(client.authenticate().await.unwrap(), "abc");
        assert_eq!(client.authenticate().await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn malformed_login_response_is_an_auth_error() {
        let server = MockServer::start().await;
        mount_login(&server, json!({"status": "error", "error": "INCORRECT_CREDENTIALS"}), 2).await;

        let client = client_for(&server, Duration::from_secs(5));
        assert!(matches!(client.authenticate().await, Err(Error::Auth { .. })));
        // Failures are not cached.
        assert!(matches!(client.authenticate().await, Err(Error::Auth { .. })));
    }

    #[tokio::test]
    async fn requests_carry_the_bearer_token() {
        let server = MockServer::start().await;
        mount_login(&server, json!({"status": "ok", "data": {"token": "abc"}}), 1).await;
        Mock::given(method("GET"))
            .and(path("/api/v2/servers"))
            .and(header("Authorization", "Bearer abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "data": [{"server_id": 1, "server_ip": "127.0.0.1", "server_port": 25565, "type": "minecraft-java"}],
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let listing = client.list_servers().await.unwrap();
        assert!(listing.is_ok());
        assert_eq!(listing.data.unwrap()[0].server_id, "1");
    }

    #[tokio::test]
    async fn http_errors_are_fetch_errors() {
        let server = MockServer::start().await;
        mount_login(&server, json!({"status": "ok", "data": {"token": "abc"}}), 1).await;
        Mock::given(method("GET"))
            .and(path("/api/v2/servers/9/stats"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        assert!(matches!(client.get_server_stats("9").await, Err(Error::Fetch { .. })));
    }

    #[tokio::test]
    async fn slow_upstreams_time_out() {
        let server = MockServer::start().await;
        mount_login(&server, json!({"status": "ok", "data": {"token": "abc"}}), 1).await;
        Mock::given(method("GET"))
            .and(path("/api/v2/servers"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "ok", "data": []}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_millis(200));
        assert!(matches!(client.list_servers().await, Err(Error::Fetch { .. })));
    }
}
