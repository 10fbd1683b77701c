//! WHOIS registration lookup over TCP port 43.
//!
//! The query goes to the root server first (IANA by default). When the root
//! answers with a `refer:`/`whois:` line the query is repeated once against
//! that server and its reply is returned verbatim.

use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::config::LookupConfig;
use crate::error::ScoutError;
use crate::lookup::records::NO_INFORMATION;

/// Well-known WHOIS port.
pub const WHOIS_PORT: u16 = 43;

static REFERRAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^[ \t]*(?:refer|whois):[ \t]*(\S+)").unwrap());

/// Returns the raw WHOIS text for a domain.
pub trait RegistrationSource: Send + Sync {
    fn whois(&self, domain: &str) -> impl Future<Output = crate::Result<String>> + Send;
}

/// Extract the referred WHOIS server from a reply, if any.
pub fn referral_server(reply: &str) -> Option<&str> {
    REFERRAL
        .captures(reply)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str())
}

/// The part of `domain` before any line break; one query line per request.
fn query_line(domain: &str) -> &str {
    domain
        .split(['\r', '\n'])
        .next()
        .unwrap_or_default()
        .trim()
}

fn from_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&c| c as char).collect()
}

/// Async WHOIS client with one level of referral.
#[derive(Debug, Clone)]
pub struct WhoisClient {
    root_server: String,
    port: u16,
    timeout: Duration,
    max_bytes: usize,
}

impl WhoisClient {
    pub fn new(root_server: impl Into<String>, timeout: Duration, max_bytes: usize) -> Self {
        Self {
            root_server: root_server.into(),
            port: WHOIS_PORT,
            timeout,
            max_bytes,
        }
    }

    pub fn from_config(config: &LookupConfig) -> Self {
        Self::new(
            config.whois_server.clone(),
            config.whois_timeout(),
            config.whois_max_bytes,
        )
    }

    /// Use a non-standard port for every server (local test servers).
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Send one query to `server` and read the reply to EOF (or `max_bytes`).
    pub async fn query(&self, server: &str, domain: &str) -> crate::Result<String> {
        let exchange = async {
            let mut stream = TcpStream::connect((server, self.port)).await?;
            stream
                .write_all(format!("{}\r\n", query_line(domain)).as_bytes())
                .await?;

            let mut buf = Vec::with_capacity(8192);
            stream
                .take(self.max_bytes as u64)
                .read_to_end(&mut buf)
                .await?;
            Ok::<Vec<u8>, std::io::Error>(buf)
        };

        let buf = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| ScoutError::WhoisTimeout(server.to_string()))?
            .map_err(|e| ScoutError::Whois(server.to_string(), e.to_string()))?;

        let reply = match std::str::from_utf8(&buf) {
            Ok(s) => s.to_string(),
            Err(_) => from_latin1(&buf),
        };
        tracing::trace!(server = %server, domain = %domain, "WHOIS reply:\n{}", reply);
        Ok(reply)
    }
}

impl RegistrationSource for WhoisClient {
    async fn whois(&self, domain: &str) -> crate::Result<String> {
        let root_reply = self.query(&self.root_server, domain).await?;

        let reply = match referral_server(&root_reply) {
            Some(referred) if !referred.eq_ignore_ascii_case(&self.root_server) => {
                tracing::debug!(
                    domain = %domain,
                    root = %self.root_server,
                    referred = %referred,
                    "following WHOIS referral"
                );
                self.query(referred, domain).await?
            }
            _ => root_reply,
        };

        if reply.trim().is_empty() {
            Ok(NO_INFORMATION.to_string())
        } else {
            Ok(reply)
        }
    }
}
