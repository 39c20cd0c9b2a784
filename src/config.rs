//! Configuration resolution
//!
//! Every field is looked up in the environment first and in the supplied config map
//! second; the first non-empty value wins. Only the key id is mandatory.

use crate::credentials::{self, Credentials};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;

/// Environment variable holding the OAuth token
pub const ENV_OAUTH_TOKEN: &str = "YANDEXCLOUD_OAUTH_TOKEN";
/// Environment variable holding the path of a service-account key file
pub const ENV_SERVICE_ACCOUNT_KEY_FILE: &str = "YANDEXCLOUD_SERVICE_ACCOUNT_KEY_FILE";
/// Environment variable holding the KMS key id
pub const ENV_KMS_KEY_ID: &str = "YANDEXCLOUD_KMS_KEY_ID";

/// Config parameter holding the OAuth token
pub const CFG_OAUTH_TOKEN: &str = "oauth_token";
/// Config parameter holding the path of a service-account key file
pub const CFG_SERVICE_ACCOUNT_KEY_FILE: &str = "service_account_key_file";
/// Config parameter holding the KMS key id
pub const CFG_KMS_KEY_ID: &str = "kms_key_id";

/// Source of environment variables
pub trait EnvSource: Send + Sync + fmt::Debug {
    /// Returns the value of `name`, if set
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads the process environment
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Fully resolved wrapper configuration
#[derive(Debug)]
pub struct WrapperConfig {
    pub key_id: String,
    pub credentials: Credentials,
}

impl WrapperConfig {
    /// Resolves key id and credentials, reading the key file if one is configured
    pub fn resolve(env: &dyn EnvSource, config: &HashMap<String, String>) -> Result<Self> {
        let key_id = resolve_key_id(env, config)?;
        let credentials = resolve_credentials(env, config)?;

        Ok(Self {
            key_id,
            credentials,
        })
    }
}

/// Resolves the KMS key id; there is no default
pub fn resolve_key_id(env: &dyn EnvSource, config: &HashMap<String, String>) -> Result<String> {
    let key_id = lookup(env, ENV_KMS_KEY_ID, config, CFG_KMS_KEY_ID);
    if key_id.is_empty() {
        return Err(Error::Config(format!(
            "missing key id: neither '{}' environment variable nor '{}' config parameter is set",
            ENV_KMS_KEY_ID, CFG_KMS_KEY_ID
        )));
    }

    Ok(key_id)
}

/// Resolves token and key file independently, then selects the credential source
pub fn resolve_credentials(
    env: &dyn EnvSource,
    config: &HashMap<String, String>,
) -> Result<Credentials> {
    let token = lookup(env, ENV_OAUTH_TOKEN, config, CFG_OAUTH_TOKEN);
    let key_file = lookup(
        env,
        ENV_SERVICE_ACCOUNT_KEY_FILE,
        config,
        CFG_SERVICE_ACCOUNT_KEY_FILE,
    );

    credentials::select(&token, &key_file)
}

fn lookup(
    env: &dyn EnvSource,
    env_name: &str,
    config: &HashMap<String, String>,
    key: &str,
) -> String {
    let from_env = env.var(env_name).unwrap_or_default();
    let from_config = config.get(key).map(String::as_str).unwrap_or_default();

    coalesce([from_env.as_str(), from_config]).to_string()
}

fn coalesce<'a>(values: impl IntoIterator<Item = &'a str>) -> &'a str {
    values.into_iter().find(|v| !v.is_empty()).unwrap_or_default()
}
