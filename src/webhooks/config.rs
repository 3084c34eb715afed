use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::utils::{get_env_with_prefix, parse_flag};

/// Pay2 gateway configuration
///
/// Keys are read from the environment only; they are skipped during
/// serialization and never printed by `Debug`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Pay2Config {
    /// Live API key, used as the webhook secret outside test mode
    #[serde(skip)]
    pub api_key: Option<SecretString>,

    /// Sandbox API key, used as the webhook secret in test mode
    #[serde(skip)]
    pub test_api_key: Option<SecretString>,

    /// Accept webhooks without verifying the signature
    #[serde(default)]
    pub test_mode: bool,
}

impl Pay2Config {
    /// Load Pay2 configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(key) = get_env_with_prefix("PAY2_API_KEY") {
            config.api_key = Some(SecretString::from(key));
        }
        if let Some(key) = get_env_with_prefix("PAY2_TEST_API_KEY") {
            config.test_api_key = Some(SecretString::from(key));
        }
        if let Some(flag) = get_env_with_prefix("PAY2_TEST_MODE") {
            config.test_mode = parse_flag(&flag).unwrap_or(false);
        }

        config
    }

    /// The secret webhooks are signed with: the test key in test mode, the
    /// live key otherwise
    pub fn active_secret(&self) -> Option<&SecretString> {
        if self.test_mode {
            self.test_api_key.as_ref()
        } else {
            self.api_key.as_ref()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn config(test_mode: bool) -> Pay2Config {
        Pay2Config {
            api_key: Some(SecretString::from("live")),
            test_api_key: Some(SecretString::from("sandbox")),
            test_mode,
        }
    }

    #[test]
    fn test_active_secret_follows_mode() {
        assert_eq!(config(false).active_secret().unwrap().expose_secret(), "live");
        assert_eq!(config(true).active_secret().unwrap().expose_secret(), "sandbox");
        assert!(Pay2Config::default().active_secret().is_none());
    }

    #[test]
    fn test_secrets_are_not_serialized() {
        let json = serde_json::to_string(&config(true)).unwrap();
        assert!(!json.contains("live"));
        assert!(!json.contains("sandbox"));
        assert!(json.contains("\"test_mode\":true"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug = format!("{:?}", config(false));
        assert!(!debug.contains("live"));
    }
}
