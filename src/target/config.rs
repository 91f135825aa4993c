//! Target configuration
//!
//! A flat, validated record. Fields this crate does not interpret (encoder
//! settings, UI hints written by other versions) are kept in `extra` so a
//! load/save cycle never drops them.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// URL schemes a target may push to
pub const SUPPORTED_SCHEMES: &[&str] = &["rtmp", "rtmps"];

/// User-configurable settings of one push target
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TargetConfig {
    /// Display name
    #[serde(default)]
    pub name: String,

    /// Server URL, e.g. `rtmp://live.example.com/app`
    #[serde(default)]
    pub server: String,

    /// Stream key appended to the server URL
    #[serde(default)]
    pub key: String,

    /// Optional RTMP username
    #[serde(default)]
    pub username: Option<String>,

    /// Optional RTMP password
    #[serde(default)]
    pub password: Option<String>,

    /// Start and stop together with the host's main stream
    #[serde(default)]
    pub sync_start: bool,

    /// Restart after a host restart if the target was live at exit
    #[serde(default)]
    pub resume_after_restart: bool,

    /// Set on exit when the target should resume at next launch
    #[serde(default)]
    pub resume_pending: bool,

    /// Target-specific fields preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TargetConfig {
    /// Create a config for `server` with the given display name
    pub fn new(name: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            server: server.into(),
            ..Default::default()
        }
    }

    /// Set the stream key
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Set RTMP credentials
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Follow the host's main stream
    pub fn sync_start(mut self, enabled: bool) -> Self {
        self.sync_start = enabled;
        self
    }

    /// Resume after a host restart
    pub fn resume_after_restart(mut self, enabled: bool) -> Self {
        self.resume_after_restart = enabled;
        self
    }

    /// Set an extra target-specific field
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Check every field this crate interprets
    pub fn validate(&self) -> Result<()> {
        let server = self.server.trim();
        if server.is_empty() {
            return Err(Error::InvalidConfig("server is empty".into()));
        }

        let (scheme, rest) = server
            .split_once("://")
            .ok_or_else(|| Error::InvalidConfig(format!("server '{}' has no scheme", server)))?;

        if !SUPPORTED_SCHEMES
            .iter()
            .any(|s| s.eq_ignore_ascii_case(scheme))
        {
            return Err(Error::InvalidConfig(format!(
                "unsupported scheme '{}'",
                scheme
            )));
        }

        let host = rest.split(['/', '?']).next().unwrap_or_default();
        if host.is_empty() {
            return Err(Error::InvalidConfig(format!("server '{}' has no host", server)));
        }

        if self.key.chars().any(char::is_whitespace) {
            return Err(Error::InvalidConfig("stream key contains whitespace".into()));
        }

        if self.password.is_some() && self.username.is_none() {
            return Err(Error::InvalidConfig("password given without username".into()));
        }

        Ok(())
    }

    /// Parse and validate one configuration record
    pub fn from_value(value: &Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::InvalidConfig("target entry is not an object".into()));
        }

        let config = Self::deserialize(value).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize every user-configurable field
    pub fn to_value(&self) -> Value {
        let mut map = self.extra.clone();

        map.insert("name".into(), Value::from(self.name.clone()));
        map.insert("server".into(), Value::from(self.server.clone()));
        map.insert("key".into(), Value::from(self.key.clone()));
        if let Some(ref username) = self.username {
            map.insert("username".into(), Value::from(username.clone()));
        }
        if let Some(ref password) = self.password {
            map.insert("password".into(), Value::from(password.clone()));
        }
        map.insert("sync-start".into(), Value::from(self.sync_start));
        map.insert(
            "resume-after-restart".into(),
            Value::from(self.resume_after_restart),
        );
        map.insert("resume-pending".into(), Value::from(self.resume_pending));

        Value::Object(map)
    }

    /// Full publish URL (server + key)
    pub fn publish_url(&self) -> String {
        let server = self.server.trim().trim_end_matches('/');
        if self.key.is_empty() {
            server.to_string()
        } else {
            format!("{}/{}", server, self.key)
        }
    }
}
