//! Client configuration from `<config_dir>/undelete/config.toml`.
//!
//! ```toml
//! [server]
//! base_url = "http://127.0.0.1:5000"
//! timeout_secs = 30
//!
//! [poll]
//! interval_ms = 600
//! retry_delay_ms = 1000
//! max_retries = 120      # 0 = retry forever
//! max_elapsed_secs = 0   # 0 = no ceiling
//!
//! [ui]
//! locale = "en"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::poller::PollPolicy;
use crate::gateway::GatewayContext;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server: ServerConfig,
    pub poll: PollConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    pub user_agent: String,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let ctx = GatewayContext::default();
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            user_agent: ctx.user_agent,
            timeout_secs: ctx.timeout_secs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_ms: u64,
    pub retry_delay_ms: u64,
    /// 0 disables the cap
    pub max_retries: u32,
    /// 0 disables the ceiling
    pub max_elapsed_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        let p = PollPolicy::default();
        Self {
            interval_ms: p.interval.as_millis() as u64,
            retry_delay_ms: p.retry_delay.as_millis() as u64,
            max_retries: p.max_retries.unwrap_or(0),
            max_elapsed_secs: p.max_elapsed.map_or(0, |d| d.as_secs()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub locale: String,
    /// Width of the terminal progress bars, in columns
    pub progress_width: u16,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { locale: "en".to_string(), progress_width: 40 }
    }
}

impl ClientConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("undelete").join("config.toml"))
    }

    /// Loads `path`, or the default location when `path` is `None`.
    /// Only an explicitly named file is required to exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) if p.exists() => p,
                _ => return Ok(Self::default()),
            },
        };
        let text = fs::read_to_string(&path).with_context(|| format!("read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parse config {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.poll.interval_ms.max(1)),
            retry_delay: Duration::from_millis(self.poll.retry_delay_ms.max(1)),
            max_retries: (self.poll.max_retries > 0).then_some(self.poll.max_retries),
            max_elapsed: (self.poll.max_elapsed_secs > 0).then(|| Duration::from_secs(self.poll.max_elapsed_secs)),
        }
    }

    pub fn gateway_context(&self) -> GatewayContext {
        GatewayContext { user_agent: self.server.user_agent.clone(), timeout_secs: self.server.timeout_secs.max(1) }
    }
}
