//! HTTP liveness check for `https://www.<domain>`.

use std::fmt;
use std::future::Future;

use crate::config::LookupConfig;

pub const ONLINE_MESSAGE: &str = "Server is online and functioning.";
pub const OFFLINE_MESSAGE: &str = "Server is offline or is not functioning.";

/// Outcome of a single liveness GET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// The server answered 200.
    Online,
    /// The request failed before any status was received.
    Offline,
    /// The server answered with some other status.
    Unknown(u16),
}

impl fmt::Display for Liveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Liveness::Online => f.write_str(ONLINE_MESSAGE),
            Liveness::Offline => f.write_str(OFFLINE_MESSAGE),
            Liveness::Unknown(status) => write!(f, "Server responded with HTTP status {}.", status),
        }
    }
}

/// Issues one GET and reports the final status code.
///
/// `Err` means no status was received at all (timeout, DNS, TLS, refused).
pub trait LivenessProbe: Send + Sync {
    fn get_status(&self, url: &str) -> impl Future<Output = crate::Result<u16>> + Send;
}

/// URL probed for a domain.
pub fn status_url(domain: &str) -> String {
    format!("https://www.{}", domain)
}

/// Probe a domain and classify the result.
pub async fn check_liveness<P: LivenessProbe>(probe: &P, domain: &str) -> Liveness {
    let url = status_url(domain);
    match probe.get_status(&url).await {
        Ok(200) => Liveness::Online,
        Ok(status) => Liveness::Unknown(status),
        Err(e) => {
            tracing::debug!(url = %url, error = %e, "liveness request failed");
            Liveness::Offline
        }
    }
}

/// `LivenessProbe` backed by a shared reqwest client (redirects followed).
#[derive(Debug, Clone)]
pub struct ReqwestProbe {
    client: reqwest::Client,
}

impl ReqwestProbe {
    pub fn from_config(config: &LookupConfig) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.status_timeout())
            .build()?;
        Ok(Self { client })
    }
}

impl LivenessProbe for ReqwestProbe {
    async fn get_status(&self, url: &str) -> crate::Result<u16> {
        let response = self.client.get(url).send().await?;
        Ok(response.status().as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScoutError;
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    struct FixedProbe {
        outcome: Option<u16>,
        seen: Mutex<Vec<String>>,
    }

    impl FixedProbe {
        fn new(outcome: Option<u16>) -> Self {
            Self {
                outcome,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl LivenessProbe for FixedProbe {
        async fn get_status(&self, url: &str) -> crate::Result<u16> {
            self.seen.lock().unwrap().push(url.to_string());
            self.outcome.ok_or_else(|| {
                ScoutError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "connection refused",
                ))
            })
        }
    }

    /// Answer a single HTTP request with the given status line.
    async fn spawn_http_server(status_line: &'static str) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                status_line
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        });
        port
    }

    fn local_probe() -> ReqwestProbe {
        ReqwestProbe::from_config(&LookupConfig::default()).unwrap()
    }

    #[test]
    fn test_status_url_prefix() {
        assert_eq!(status_url("example.com"), "https://www.example.com");
    }

    #[test]
    fn test_liveness_messages() {
        assert_eq!(Liveness::Online.to_string(), "Server is online and functioning.");
        assert_eq!(
            Liveness::Offline.to_string(),
            "Server is offline or is not functioning."
        );
        assert_eq!(
            Liveness::Unknown(404).to_string(),
            "Server responded with HTTP status 404."
        );
    }

    #[tokio::test]
    async fn test_200_is_online() {
        let probe = FixedProbe::new(Some(200));
        assert_eq!(check_liveness(&probe, "example.com").await, Liveness::Online);
        assert_eq!(
            probe.seen.lock().unwrap().as_slice(),
            &["https://www.example.com".to_string()]
        );
    }

    #[tokio::test]
    async fn test_connection_error_is_offline() {
        let probe = FixedProbe::new(None);
        assert_eq!(check_liveness(&probe, "example.com").await, Liveness::Offline);
    }

    #[tokio::test]
    async fn test_other_status_is_unknown() {
        let probe = FixedProbe::new(Some(503));
        assert_eq!(
            check_liveness(&probe, "example.com").await,
            Liveness::Unknown(503)
        );
    }

    #[tokio::test]
    async fn test_reqwest_probe_reads_status() {
        let port = spawn_http_server("200 OK").await;
        let status = local_probe()
            .get_status(&format!("http://127.0.0.1:{}/", port))
            .await
            .unwrap();
        assert_eq!(status, 200);
    }

    #[tokio::test]
    async fn test_reqwest_probe_reports_404() {
        let port = spawn_http_server("404 Not Found").await;
        let status = local_probe()
            .get_status(&format!("http://127.0.0.1:{}/", port))
            .await
            .unwrap();
        assert_eq!(status, 404);
    }

    #[tokio::test]
    async fn test_reqwest_probe_refused_is_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let result = local_probe()
            .get_status(&format!("http://127.0.0.1:{}/", port))
            .await;
        assert!(matches!(result, Err(ScoutError::Transport(_))));
    }
}
