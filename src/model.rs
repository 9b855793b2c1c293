//! Shapes of the Crafty v2 API payloads.
//!
//! Crafty is loose about types (ids are numbers on older releases and UUID strings on newer ones, memory is either a
//! size string or `0`, `started` is either a timestamp or the string `"False"`). Every dynamic field is therefore
//! optional and decoded leniently: a missing or mistyped field becomes `None` instead of failing the whole payload.

use serde::{
    de::DeserializeOwned,
    Deserialize,
    Deserializer,
    Serialize,
};
use serde_json::{
    Map,
    Value,
};
use std::net::IpAddr;

/// Value of the `status` field on successful responses.
pub const STATUS_OK: &str = "ok";

/// Common `{status, data}` envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub status: String,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LoginData {
    #[serde(default, deserialize_with = "lenient")]
    pub(crate) token: Option<String>,
}

/// One entry of `GET /servers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSummary {
    #[serde(deserialize_with = "id_string")]
    pub server_id: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub server_ip: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub server_port: Option<u16>,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub server_type: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    /// Remaining listing fields, kept verbatim for the snapshot file.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ServerSummary {
    /// Whether the server advertises an address only reachable from the Crafty host itself.
    pub fn advertises_loopback(&self) -> bool {
        match self.server_ip.as_deref().map(str::trim) {
            Some(ip) if ip.eq_ignore_ascii_case("localhost") => true,
            Some(ip) => ip.parse::<IpAddr>().map(|ip| ip.is_loopback()).unwrap_or(false),
            None => false,
        }
    }
}

/// Payload of `GET /servers/{id}/stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerStats {
    #[serde(default, deserialize_with = "lenient")]
    pub cpu: Option<f64>,
    /// Human readable size such as `"1.2GB"`. Crafty reports a bare `0` while the server is stopped, so this is kept
    /// as raw JSON.
    #[serde(default)]
    pub mem: Value,
    #[serde(default, deserialize_with = "lenient")]
    pub mem_percent: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub online: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub max: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub running: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub crashed: Option<bool>,
    /// Start timestamp, or [`NEVER_STARTED`].
    #[serde(default, deserialize_with = "lenient")]
    pub started: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub world_size: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub desc: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub world_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub version: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Sentinel Crafty puts into `started` for servers that never ran.
pub const NEVER_STARTED: &str = "False";

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| serde_json::from_value(value).ok()))
}

fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(id) => Ok(id),
        Value::Number(id) => Ok(id.to_string()),
        other => Err(serde::de::Error::custom(format!("unsupported server id {other}"))),
    }
}
