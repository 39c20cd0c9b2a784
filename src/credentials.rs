//! Credential sources for the KMS session
//!
//! Exactly one source is chosen when the wrapper is first configured: an OAuth token, a
//! service-account authorized key read from a JSON file, or the identity of the compute
//! instance the process runs on.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

/// Credentials handed to the [`ClientFactory`](crate::kms::ClientFactory)
pub enum Credentials {
    /// Yandex Passport OAuth token
    OAuthToken(Zeroizing<String>),

    /// Service-account authorized key
    ServiceAccountKey(ServiceAccountKey),

    /// Ambient identity of the compute instance, no explicit secret
    InstanceServiceAccount,
}

impl Credentials {
    /// Short name of the credential source, safe to log
    pub fn kind(&self) -> &'static str {
        match self {
            Credentials::OAuthToken(_) => "oauth_token",
            Credentials::ServiceAccountKey(_) => "service_account_key",
            Credentials::InstanceServiceAccount => "instance_service_account",
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::OAuthToken(_) => f.write_str("OAuthToken([REDACTED])"),
            Credentials::ServiceAccountKey(key) => {
                f.debug_tuple("ServiceAccountKey").field(key).finish()
            }
            Credentials::InstanceServiceAccount => f.write_str("InstanceServiceAccount"),
        }
    }
}

/// Authorized key of a service account, as issued by `yc iam key create`
#[derive(Deserialize)]
pub struct ServiceAccountKey {
    /// Key id, used as the `kid` of signed JWTs
    pub id: String,

    /// Account the key belongs to
    pub service_account_id: String,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub key_algorithm: Option<String>,

    #[serde(default)]
    pub public_key: Option<String>,

    /// PEM encoded private key
    #[serde(deserialize_with = "zeroizing_string")]
    private_key: Zeroizing<String>,
}

fn zeroizing_string<'de, D>(deserializer: D) -> std::result::Result<Zeroizing<String>, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(Zeroizing::new)
}

impl ServiceAccountKey {
    /// Reads and validates a key file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = Zeroizing::new(std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "invalid key file: cannot read {}: {}",
                path.display(),
                e
            ))
        })?);

        Self::from_json(&contents)
            .map_err(|e| Error::Config(format!("invalid key file {}: {}", path.display(), e)))
    }

    /// Parses and validates the JSON contents of a key file
    pub fn from_json(json: &str) -> std::result::Result<Self, String> {
        let key: ServiceAccountKey = serde_json::from_str(json).map_err(|e| e.to_string())?;

        if key.id.is_empty() {
            return Err("key id is empty".into());
        }
        if key.service_account_id.is_empty() {
            return Err("service account id is empty".into());
        }
        if !key.private_key.contains("PRIVATE KEY-----") {
            return Err("private key is not PEM encoded".into());
        }

        Ok(key)
    }

    /// PEM encoded private key
    pub fn private_key(&self) -> &str {
        &self.private_key
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("id", &self.id)
            .field("service_account_id", &self.service_account_id)
            .field("created_at", &self.created_at)
            .field("key_algorithm", &self.key_algorithm)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

/// Picks the credential source from an already resolved token and key file path
///
/// Empty strings count as unset.
pub fn select(oauth_token: &str, key_file: &str) -> Result<Credentials> {
    if !oauth_token.is_empty() && !key_file.is_empty() {
        return Err(Error::Config(
            "ambiguous credentials: both an OAuth token and a service account key file are set"
                .into(),
        ));
    }

    if !oauth_token.is_empty() {
        return Ok(Credentials::OAuthToken(Zeroizing::new(oauth_token.to_string())));
    }

    if !key_file.is_empty() {
        let key = ServiceAccountKey::from_json_file(PathBuf::from(key_file))?;
        return Ok(Credentials::ServiceAccountKey(key));
    }

    Ok(Credentials::InstanceServiceAccount)
}
