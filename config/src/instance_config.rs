use serde::{
    Deserialize,
    Serialize,
};
use url::Url;

/// One Crafty Controller installation to poll.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstanceConfig {
    /// Host (optionally with `:port`) the API is reached at. Also used as the display host for servers that
    /// advertise a loopback address.
    pub hostname: String,
    pub username: String,
    pub password: String,
    /// Overrides the `https://{hostname}/api/v2` base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<Url>,
    /// Crafty generates a self-signed certificate on first start.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl InstanceConfig {
    pub fn new(hostname: impl ToString, username: impl ToString, password: impl ToString) -> Self {
        Self {
            hostname: hostname.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            base_url: None,
            accept_invalid_certs: false,
        }
    }

    /// Base URL of the v2 API, without a trailing slash.
    pub fn api_base_url(&self) -> Result<Url, url::ParseError> {
        match &self.base_url {
            Some(url) => Ok(url.clone()),
            None => Url::parse(&format!("https://{}/api/v2", self.hostname)),
        }
    }

    pub(crate) fn redacted(&self) -> Self {
        Self {
            password: "********".to_string(),
            ..self.clone()
        }
    }
}
