use crate::config::env_parse;
use reqwest::Client;
use std::time::Duration;
use tracing::warn;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

// Catalog pages with full variant data can take a while on a cold backend.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl HttpSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            timeout: positive_secs(env_parse("HTTP_TIMEOUT_SECS")).unwrap_or(defaults.timeout),
            connect_timeout: positive_secs(env_parse("HTTP_CONNECT_TIMEOUT_SECS"))
                .unwrap_or(defaults.connect_timeout),
        }
    }

    pub fn client(&self) -> Client {
        Client::builder()
            .user_agent(USER_AGENT)
            .gzip(true)
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .build()
            .unwrap_or_else(|err| {
                warn!(target = "sync.http", error = %err, "client_builder_failed");
                Client::new()
            })
    }
}

// A zero timeout would fail every request.
fn positive_secs(secs: Option<u64>) -> Option<Duration> {
    secs.filter(|secs| *secs > 0).map(Duration::from_secs)
}

pub fn build_client() -> Client {
    HttpSettings::from_env().client()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_favour_slow_catalog_pages() {
        let settings = HttpSettings::default();
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert_eq!(settings.connect_timeout, Duration::from_secs(5));
        assert!(settings.connect_timeout < settings.timeout);
    }

    #[test]
    fn unset_or_zero_timeouts_fall_back() {
        assert_eq!(positive_secs(None), None);
        assert_eq!(positive_secs(Some(0)), None);
        assert_eq!(positive_secs(Some(12)), Some(Duration::from_secs(12)));
    }

    #[test]
    fn user_agent_names_the_tool() {
        assert!(USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(USER_AGENT.ends_with(env!("CARGO_PKG_VERSION")));
    }
}
