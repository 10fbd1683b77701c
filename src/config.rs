//! Domain Scout configuration: deserialization and validation.

use crate::error::ScoutError;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Strip an env var reference to its variable name.
///
/// Accepts `${VAR_NAME}` syntax only. Returns `None` if the value is not a
/// valid env-var reference.
pub fn parse_env_ref(value: &str) -> Option<&str> {
    value.strip_prefix("${").and_then(|s| s.strip_suffix('}'))
}

/// Top-level Domain Scout configuration, parsed from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoutConfig {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Telegram bot connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Env var reference (`${VAR}`) holding the bot token.
    pub token: Option<String>,
    /// File whose trimmed contents are the bot token.
    pub token_file: Option<PathBuf>,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Pause between polls when a poll fails or returns nothing.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Long-poll timeout passed to getUpdates.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
}

/// Upstream used for DNS record lookups.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResolverKind {
    /// Nameservers from the host's resolv.conf / registry.
    #[default]
    System,
    Google,
    Cloudflare,
    Quad9,
}

/// Settings for the three lookup backends.
#[derive(Debug, Clone, Deserialize)]
pub struct LookupConfig {
    #[serde(default)]
    pub resolver: ResolverKind,
    #[serde(default = "default_dns_timeout_secs")]
    pub dns_timeout_secs: u64,
    /// Root WHOIS server; referrals are followed from here.
    #[serde(default = "default_whois_server")]
    pub whois_server: String,
    #[serde(default = "default_whois_timeout_secs")]
    pub whois_timeout_secs: u64,
    /// Replies longer than this are truncated.
    #[serde(default = "default_whois_max_bytes")]
    pub whois_max_bytes: usize,
    #[serde(default = "default_status_timeout_secs")]
    pub status_timeout_secs: u64,
}

/// File output settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Directory for per-request temp files. Defaults to the OS temp dir.
    pub temp_dir: Option<PathBuf>,
}

fn default_api_base_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_interval_secs() -> u64 {
    2
}

fn default_poll_timeout_secs() -> u64 {
    10
}

fn default_dns_timeout_secs() -> u64 {
    5
}

fn default_whois_server() -> String {
    "whois.iana.org".to_string()
}

fn default_whois_timeout_secs() -> u64 {
    15
}

fn default_whois_max_bytes() -> usize {
    64 * 1024
}

fn default_status_timeout_secs() -> u64 {
    10
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: None,
            token_file: None,
            api_base_url: default_api_base_url(),
            poll_interval_secs: default_poll_interval_secs(),
            poll_timeout_secs: default_poll_timeout_secs(),
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            resolver: ResolverKind::default(),
            dns_timeout_secs: default_dns_timeout_secs(),
            whois_server: default_whois_server(),
            whois_timeout_secs: default_whois_timeout_secs(),
            whois_max_bytes: default_whois_max_bytes(),
            status_timeout_secs: default_status_timeout_secs(),
        }
    }
}

impl LookupConfig {
    pub fn dns_timeout(&self) -> Duration {
        Duration::from_secs(self.dns_timeout_secs)
    }

    pub fn whois_timeout(&self) -> Duration {
        Duration::from_secs(self.whois_timeout_secs)
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.status_timeout_secs)
    }
}

impl BotConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Resolve the bot token from its configured source.
    ///
    /// `token` must be a `${VAR}` reference; `token_file` is read and trimmed.
    /// An empty result is an error either way.
    pub fn resolve_token(&self) -> crate::Result<String> {
        let token = match (&self.token, &self.token_file) {
            (Some(reference), None) => {
                let var = parse_env_ref(reference).ok_or_else(|| {
                    ScoutError::TokenUnavailable(format!(
                        "token must be a ${{VAR}} reference, got '{}'",
                        reference
                    ))
                })?;
                std::env::var(var).map_err(|_| {
                    ScoutError::TokenUnavailable(format!("env var '{}' is not set", var))
                })?
            }
            (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
                ScoutError::TokenUnavailable(format!(
                    "failed to read token file {}: {}",
                    path.display(),
                    e
                ))
            })?,
            (Some(_), Some(_)) => {
                return Err(ScoutError::TokenUnavailable(
                    "set either 'token' or 'token_file', not both".to_string(),
                ));
            }
            (None, None) => {
                return Err(ScoutError::TokenUnavailable(
                    "no 'token' or 'token_file' configured in [bot]".to_string(),
                ));
            }
        };

        let token = token.trim().to_string();
        if token.is_empty() {
            return Err(ScoutError::TokenUnavailable("token is empty".to_string()));
        }
        Ok(token)
    }
}

impl ScoutConfig {
    /// Validate settings shared by every mode, failing fast before any network use.
    pub fn validate(&self) -> crate::Result<()> {
        // 1. Lookup timeouts and limits
        let lookup = &self.lookup;
        for (name, value) in [
            ("dns_timeout_secs", lookup.dns_timeout_secs),
            ("whois_timeout_secs", lookup.whois_timeout_secs),
            ("status_timeout_secs", lookup.status_timeout_secs),
        ] {
            if value == 0 {
                return Err(ScoutError::InvalidConfig(
                    "lookup".to_string(),
                    format!("{} must be > 0", name),
                ));
            }
        }
        if lookup.whois_max_bytes == 0 {
            return Err(ScoutError::InvalidConfig(
                "lookup".to_string(),
                "whois_max_bytes must be > 0".to_string(),
            ));
        }
        if lookup.whois_server.trim().is_empty() {
            return Err(ScoutError::InvalidConfig(
                "lookup".to_string(),
                "whois_server must not be empty".to_string(),
            ));
        }

        // 2. Temp dir, when given, must already exist
        if let Some(dir) = &self.output.temp_dir {
            if !dir.is_dir() {
                return Err(ScoutError::InvalidConfig(
                    "output".to_string(),
                    format!("temp_dir {} is not a directory", dir.display()),
                ));
            }
        }

        Ok(())
    }

    /// Validate everything needed to run the Telegram bot.
    pub fn validate_for_bot(&self) -> crate::Result<()> {
        self.validate()?;

        let bot = &self.bot;
        match (&bot.token, &bot.token_file) {
            (None, None) => {
                return Err(ScoutError::InvalidConfig(
                    "bot".to_string(),
                    "one of 'token' or 'token_file' is required".to_string(),
                ));
            }
            (Some(_), Some(_)) => {
                return Err(ScoutError::InvalidConfig(
                    "bot".to_string(),
                    "'token' and 'token_file' are mutually exclusive".to_string(),
                ));
            }
            (Some(token), None) if parse_env_ref(token).is_none() => {
                return Err(ScoutError::InvalidConfig(
                    "bot".to_string(),
                    "'token' must be a ${VAR} reference; put literal tokens in token_file"
                        .to_string(),
                ));
            }
            _ => {}
        }

        if bot.poll_interval_secs == 0 {
            return Err(ScoutError::InvalidConfig(
                "bot".to_string(),
                "poll_interval_secs must be > 0".to_string(),
            ));
        }
        if bot.api_base_url.trim().is_empty() {
            return Err(ScoutError::InvalidConfig(
                "bot".to_string(),
                "api_base_url must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
