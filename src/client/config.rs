use std::env;
use std::time::Duration;

use log::info;
use url::Url;

use crate::client::error::ConnectionError;
use crate::client::services::connection_registry::{ChannelKey, RegistryConfig};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub ws_base: String,
    pub auth_token: String,
    /// Local viewer, used to filter self-echo.
    pub user_id: String,
    pub connect_debounce_ms: u64,
    pub reconnect_delay_ms: u64,
    pub processed_id_capacity: usize,
    pub processed_id_trim_to: usize,
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ws_base: "ws://127.0.0.1:8000/ws".to_string(),
            auth_token: String::new(),
            user_id: String::new(),
            connect_debounce_ms: 100,
            reconnect_delay_ms: 3000,
            processed_id_capacity: 300,
            processed_id_trim_to: 200,
            log_level: "info".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();
        let config = Self {
            ws_base: env::var("MESSAGING_WS_BASE").unwrap_or(defaults.ws_base),
            auth_token: env::var("MESSAGING_AUTH_TOKEN").unwrap_or_default(),
            user_id: env::var("MESSAGING_USER_ID").unwrap_or_default(),
            connect_debounce_ms: env::var("WS_CONNECT_DEBOUNCE_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.connect_debounce_ms),
            reconnect_delay_ms: env::var("WS_RECONNECT_DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.reconnect_delay_ms),
            processed_id_capacity: env::var("PROCESSED_ID_CAPACITY").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.processed_id_capacity),
            processed_id_trim_to: env::var("PROCESSED_ID_TRIM_TO").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.processed_id_trim_to),
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
        };
        info!(
            "[CONFIG] ws base {} (debounce {}ms, reconnect {}ms)",
            config.ws_base, config.connect_debounce_ms, config.reconnect_delay_ms
        );
        config
    }

    /// `LOG_LEVEL` alone, so the logger can be installed before the rest
    /// of the config is read and logged.
    pub fn log_level_from_env() -> String {
        dotenvy::dotenv().ok();
        env::var("LOG_LEVEL").unwrap_or_else(|_| Self::default().log_level)
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            connect_debounce: Duration::from_millis(self.connect_debounce_ms),
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
        }
    }

    /// `{base}/notifications/?token=..` or `{base}/chat/{thread}/?token=..`
    pub fn channel_url(&self, channel: &ChannelKey) -> Result<Url, ConnectionError> {
        let mut url = Url::parse(&self.ws_base)
            .map_err(|e| ConnectionError::InvalidUrl(format!("{}: {}", self.ws_base, e)))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ConnectionError::InvalidUrl(format!("{}: cannot be a base", self.ws_base)))?;
            segments.pop_if_empty();
            match channel {
                ChannelKey::Notifications => {
                    segments.push("notifications");
                }
                ChannelKey::Thread(thread_id) => {
                    segments.push("chat").push(thread_id);
                }
            }
            segments.push("");
        }
        if !self.auth_token.is_empty() {
            url.query_pairs_mut().append_pair("token", &self.auth_token);
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClientConfig {
        ClientConfig {
            ws_base: "wss://api.example.com/ws/".into(),
            auth_token: "tok en".into(),
            ..ClientConfig::default()
        }
    }

    #[test]
    fn notification_url_carries_token() {
        let url = config().channel_url(&ChannelKey::Notifications).unwrap();
        assert_eq!(url.as_str(), "wss://api.example.com/ws/notifications/?token=tok+en");
    }

    #[test]
    fn thread_url_is_scoped_to_thread() {
        let url = config().channel_url(&ChannelKey::Thread("42".into())).unwrap();
        assert_eq!(url.as_str(), "wss://api.example.com/ws/chat/42/?token=tok+en");
    }

    #[test]
    fn token_is_optional() {
        let url = ClientConfig::default().channel_url(&ChannelKey::Notifications).unwrap();
        assert_eq!(url.as_str(), "ws://127.0.0.1:8000/ws/notifications/");
    }

    /// Restores the touched variables even when an assertion fails.
    struct EnvGuard(&'static [&'static str]);

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for key in self.0 {
                env::remove_var(key);
            }
        }
    }

    // The only test in this crate that touches these variables.
    #[test]
    fn unparseable_numbers_fall_back_to_defaults() {
        let _guard = EnvGuard(&["WS_RECONNECT_DELAY_MS", "PROCESSED_ID_CAPACITY", "LOG_LEVEL"]);
        env::set_var("WS_RECONNECT_DELAY_MS", "abc");
        env::set_var("PROCESSED_ID_CAPACITY", "500");
        env::remove_var("LOG_LEVEL");

        let cfg = ClientConfig::from_env();
        assert_eq!(cfg.reconnect_delay_ms, 3000);
        assert_eq!(cfg.processed_id_capacity, 500);
        assert_eq!(ClientConfig::log_level_from_env(), "info");

        env::set_var("LOG_LEVEL", "debug");
        assert_eq!(ClientConfig::log_level_from_env(), "debug");
    }

    #[test]
    fn bad_base_is_rejected() {
        let cfg = ClientConfig { ws_base: "not a url".into(), ..ClientConfig::default() };
        assert!(matches!(
            cfg.channel_url(&ChannelKey::Notifications),
            Err(ConnectionError::InvalidUrl(_))
        ));
    }
}
