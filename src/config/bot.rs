// src/config/bot.rs
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf, time::Duration};

const ENV_PATH: &str = "BOT_CONFIG_PATH";
const DEFAULT_PATH: &str = "config/bot.toml";

fn default_news_api_url() -> String {
    "https://hiru-news2.vercel.app/api".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_poll_interval_mins() -> u64 {
    10
}
fn default_http_timeout_secs() -> u64 {
    15
}
fn default_gateway_url() -> String {
    "http://127.0.0.1:3001".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// WhatsApp session held by the HTTP gateway sidecar.
    #[default]
    Gateway,
    /// stdin/stdout, for local runs.
    Console,
}

impl std::str::FromStr for TransportKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gateway" => Ok(TransportKind::Gateway),
            "console" => Ok(TransportKind::Console),
            other => anyhow::bail!("unknown transport '{other}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub news_api_url: String,
    pub port: u16,
    pub poll_interval_mins: u64,
    pub http_timeout_secs: u64,
    pub transport: TransportKind,
    pub gateway_url: String,
    /// Bearer token for outbound gateway calls.
    pub gateway_token: Option<String>,
    /// Expected `x-webhook-token` on inbound gateway calls.
    pub webhook_token: Option<String>,
    pub notify_after_failed_probe: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            news_api_url: default_news_api_url(),
            port: default_port(),
            poll_interval_mins: default_poll_interval_mins(),
            http_timeout_secs: default_http_timeout_secs(),
            transport: TransportKind::default(),
            gateway_url: default_gateway_url(),
            gateway_token: None,
            webhook_token: None,
            notify_after_failed_probe: false,
        }
    }
}

impl BotConfig {
    /// Load config using env var + fallbacks:
    /// 1) $BOT_CONFIG_PATH (must exist)
    /// 2) config/bot.toml when present
    /// 3) built-in defaults
    ///
    /// then apply environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var(ENV_PATH) {
            Ok(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    anyhow::bail!("{ENV_PATH} points to non-existent path {}", pb.display());
                }
                Self::load_from_file(&pb)?
            }
            Err(_) => {
                let default = PathBuf::from(DEFAULT_PATH);
                if default.exists() {
                    Self::load_from_file(&default)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_overrides(|key| std::env::var(key).ok());
        cfg.sanitize();
        Ok(cfg)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading bot config from {}", path.display()))?;
        Self::from_toml_str(&data).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let mut cfg: BotConfig = toml::from_str(s)?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Apply overrides from `get` (the process env in production). Values
    /// that do not parse are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = var("NEWS_API_URL") {
            self.news_api_url = v;
        }
        if let Some(v) = var("PORT") {
            parse_into(&mut self.port, "PORT", &v);
        }
        if let Some(v) = var("POLL_INTERVAL_MINS") {
            parse_into(&mut self.poll_interval_mins, "POLL_INTERVAL_MINS", &v);
        }
        if let Some(v) = var("HTTP_TIMEOUT_SECS") {
            parse_into(&mut self.http_timeout_secs, "HTTP_TIMEOUT_SECS", &v);
        }
        if let Some(v) = var("BOT_TRANSPORT") {
            parse_into(&mut self.transport, "BOT_TRANSPORT", &v);
        }
        if let Some(v) = var("GATEWAY_URL") {
            self.gateway_url = v;
        }
        if let Some(v) = var("GATEWAY_TOKEN") {
            self.gateway_token = Some(v);
        }
        if let Some(v) = var("WEBHOOK_TOKEN") {
            self.webhook_token = Some(v);
        }
        if let Some(v) = var("NOTIFY_AFTER_FAILED_PROBE") {
            match v.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.notify_after_failed_probe = true,
                "0" | "false" | "no" | "off" => self.notify_after_failed_probe = false,
                _ => tracing::warn!(value = %v, "NOTIFY_AFTER_FAILED_PROBE is not a boolean; ignored"),
            }
        }
    }

    fn sanitize(&mut self) {
        if self.poll_interval_mins == 0 {
            tracing::warn!("poll interval of 0 minutes clamped to 1");
            self.poll_interval_mins = 1;
        }
        if self.http_timeout_secs == 0 {
            self.http_timeout_secs = default_http_timeout_secs();
        }
        if self.news_api_url.trim().is_empty() {
            self.news_api_url = default_news_api_url();
        }
        if self.gateway_url.trim().is_empty() {
            self.gateway_url = default_gateway_url();
        }
        self.gateway_token = self.gateway_token.take().filter(|t| !t.trim().is_empty());
        self.webhook_token = self.webhook_token.take().filter(|t| !t.trim().is_empty());
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_mins.max(1) * 60)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }
}

fn parse_into<T: std::str::FromStr>(slot: &mut T, key: &str, raw: &str) {
    match raw.parse::<T>() {
        Ok(v) => *slot = v,
        Err(_) => tracing::warn!(key, value = %raw, "invalid config override; keeping current value"),
    }
}
