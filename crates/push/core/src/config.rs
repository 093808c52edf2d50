//! Credential resolution.
//!
//! The engine never reaches for process-wide settings; everything a
//! provider call needs is resolved explicitly through
//! [`CredentialProvider`] per (application, provider) pair.

use std::collections::HashMap;
use std::time::Duration;

use crate::{DispatchError, Provider};

/// Secrets a provider needs, one variant per authentication scheme.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Credentials {
    /// APNs TLS certificate authentication (PKCS#12 bundle on disk).
    ApnsCertificate {
        certificate_path: String,
        #[serde(default)]
        password: String,
        /// APNs topic, usually the app bundle id.
        topic: String,
    },
    /// APNs token (p8 key) authentication.
    ApnsToken {
        key_path: String,
        key_id: String,
        team_id: String,
        topic: String,
    },
    /// FCM legacy HTTP server key.
    FcmApiKey { api_key: String },
    /// WNS OAuth client credentials.
    Wns {
        package_security_id: String,
        secret_key: String,
    },
    /// WebPush VAPID key pair and claims. The private key is a
    /// PEM-encoded EC key; the public key is the base64url-encoded
    /// uncompressed point handed to browsers at subscription time.
    WebPush {
        vapid_private_key: String,
        vapid_public_key: String,
        /// `sub` claim, a `mailto:` or `https:` contact URI.
        vapid_subject: String,
    },
}

fn default_max_recipients() -> usize {
    1000
}

fn default_timeout_ms() -> u64 {
    1000
}

fn default_concurrency() -> usize {
    32
}

/// Everything resolved for one (application, provider) pair: secrets,
/// endpoint override and call limits.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ProviderConfig {
    pub credentials: Credentials,
    /// Overrides the provider's default endpoint (FCM send URL, WNS
    /// access-token URL, WebPush legacy post URL).
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Upper bound on recipients per provider call.
    #[serde(default = "default_max_recipients")]
    pub max_recipients: usize,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Bound on concurrent in-flight APNs requests.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub use_sandbox: bool,
}

impl ProviderConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            endpoint: None,
            max_recipients: default_max_recipients(),
            timeout_ms: default_timeout_ms(),
            concurrency: default_concurrency(),
            use_sandbox: false,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Resolves per-application provider configuration.
pub trait CredentialProvider: Send + Sync {
    /// Resolve the configuration for an (application, provider) pair.
    /// Fails with [`DispatchError::Configuration`] when the pair is
    /// unknown or required fields are missing.
    fn resolve(
        &self,
        application_id: &str,
        provider: Provider,
    ) -> Result<ProviderConfig, DispatchError>;
}

/// In-memory credential table, loadable from serde (TOML/JSON) config:
/// application id → provider → [`ProviderConfig`].
#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct StaticCredentials {
    applications: HashMap<String, HashMap<Provider, ProviderConfig>>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        application_id: impl Into<String>,
        provider: Provider,
        config: ProviderConfig,
    ) -> &mut Self {
        self.applications
            .entry(application_id.into())
            .or_default()
            .insert(provider, config);
        self
    }
}

impl CredentialProvider for StaticCredentials {
    fn resolve(
        &self,
        application_id: &str,
        provider: Provider,
    ) -> Result<ProviderConfig, DispatchError> {
        let config = self
            .applications
            .get(application_id)
            .and_then(|by_provider| by_provider.get(&provider))
            .ok_or_else(|| {
                DispatchError::configuration(
                    application_id,
                    provider,
                    "no credentials configured",
                )
            })?;

        validate(application_id, provider, config)?;
        Ok(config.clone())
    }
}

fn validate(
    application_id: &str,
    provider: Provider,
    config: &ProviderConfig,
) -> Result<(), DispatchError> {
    let missing = |field: &str| {
        DispatchError::configuration(application_id, provider, format!("{field} is missing"))
    };

    match &config.credentials {
        Credentials::ApnsCertificate {
            certificate_path,
            topic,
            ..
        } => {
            if certificate_path.is_empty() {
                return Err(missing("certificate_path"));
            }
            if topic.is_empty() {
                return Err(missing("topic"));
            }
        }
        Credentials::ApnsToken {
            key_path,
            key_id,
            team_id,
            topic,
        } => {
            for (name, value) in [
                ("key_path", key_path),
                ("key_id", key_id),
                ("team_id", team_id),
                ("topic", topic),
            ] {
                if value.is_empty() {
                    return Err(missing(name));
                }
            }
        }
        Credentials::FcmApiKey { api_key } => {
            if api_key.is_empty() {
                return Err(missing("api_key"));
            }
        }
        Credentials::Wns {
            package_security_id,
            secret_key,
        } => {
            if package_security_id.is_empty() {
                return Err(missing("package_security_id"));
            }
            if secret_key.is_empty() {
                return Err(missing("secret_key"));
            }
        }
        Credentials::WebPush {
            vapid_private_key,
            vapid_public_key,
            vapid_subject,
        } => {
            if vapid_private_key.is_empty() {
                return Err(missing("vapid_private_key"));
            }
            if vapid_public_key.is_empty() {
                return Err(missing("vapid_public_key"));
            }
            if vapid_subject.is_empty() {
                return Err(missing("vapid_subject"));
            }
        }
    }

    if config.max_recipients == 0 {
        return Err(DispatchError::configuration(
            application_id,
            provider,
            "max_recipients must be at least 1",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_unknown_pair() {
        let creds = StaticCredentials::new();
        let err = creds.resolve("app-1", Provider::Fcm).unwrap_err();
        assert!(matches!(err, DispatchError::Configuration { .. }));
    }

    #[test]
    fn test_resolve_rejects_empty_api_key() {
        let mut creds = StaticCredentials::new();
        creds.insert(
            "app-1",
            Provider::Fcm,
            ProviderConfig::new(Credentials::FcmApiKey { api_key: String::new() }),
        );
        let err = creds.resolve("app-1", Provider::Fcm).unwrap_err();
        assert!(err.to_string().contains("api_key is missing"));
    }

    #[test]
    fn test_resolve_defaults() {
        let mut creds = StaticCredentials::new();
        creds.insert(
            "app-1",
            Provider::Fcm,
            ProviderConfig::new(Credentials::FcmApiKey { api_key: "key".into() }),
        );
        let config = creds.resolve("app-1", Provider::Fcm).unwrap();
        assert_eq!(config.max_recipients, 1000);
        assert_eq!(config.timeout(), Duration::from_millis(1000));
        assert_eq!(config.concurrency, 32);
    }

    #[test]
    fn test_static_credentials_from_json() {
        let json = serde_json::json!({
            "app-1": {
                "WNS": {
                    "credentials": {
                        "kind": "wns",
                        "package_security_id": "ms-app://sid",
                        "secret_key": "secret"
                    }
                }
            }
        });
        let creds: StaticCredentials = serde_json::from_value(json).unwrap();
        let config = creds.resolve("app-1", Provider::Wns).unwrap();
        assert!(matches!(config.credentials, Credentials::Wns { .. }));
    }
}
