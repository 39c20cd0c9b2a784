//! The KMS-backed envelope wrapper

use crate::config::{self, EnvSource, ProcessEnv, WrapperConfig, CFG_KMS_KEY_ID};
use crate::envelope::{AesGcmEnvelope, EncryptedBlob, EnvelopeCipher};
use crate::error::{Error, Result};
use crate::kms::{ClientFactory, SymmetricCryptoClient};
use crate::tracker::KeyIdTracker;
use crate::{KeyWrapper, YANDEXCLOUD_KMS};

use arc_swap::ArcSwap;
use async_trait::async_trait;
use metrics::{counter, histogram};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Value round-tripped through the KMS when the client is first built
const SELF_TEST_PLAINTEXT: &[u8] = b"plaintext";

/// Envelope encryption with data keys wrapped by a Yandex.Cloud KMS symmetric key
///
/// The KMS client is built on the first successful [`KeyWrapper::set_config`] and kept
/// for the lifetime of the wrapper. Later calls only replace the key id.
pub struct Wrapper {
    client: OnceLock<Arc<dyn SymmetricCryptoClient>>,
    key_id: ArcSwap<String>,
    current_key_id: KeyIdTracker,
    factory: Arc<ClientFactory>,
    env: Arc<dyn EnvSource>,
    envelope: Arc<dyn EnvelopeCipher>,
    configure: tokio::sync::Mutex<()>,
}

impl fmt::Debug for Wrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wrapper")
            .field("configured", &self.client.get().is_some())
            .field("key_id", &self.key_id.load_full())
            .field("current_key_id", &self.current_key_id)
            .field("env", &self.env)
            .field("envelope", &self.envelope)
            .finish()
    }
}

impl Wrapper {
    /// Creates a wrapper that reads the process environment and seals with AES-256-GCM
    pub fn new(factory: Arc<ClientFactory>) -> Self {
        WrapperBuilder::new(factory).build()
    }

    /// Starts a builder
    pub fn builder(factory: Arc<ClientFactory>) -> WrapperBuilder {
        WrapperBuilder::new(factory)
    }

    /// Reports whether `blob` was wrapped under a key other than the one the KMS most
    /// recently reported, i.e. whether the caller may want to re-encrypt it
    pub fn needs_rewrap(&self, blob: &EncryptedBlob) -> bool {
        let current = self.current_key_id.get();
        !current.is_empty() && blob.key_id != current
    }

    fn client(&self, operation: &'static str) -> Result<&Arc<dyn SymmetricCryptoClient>> {
        self.client.get().ok_or(Error::NotConfigured(operation))
    }

    /// Builds the client and self-tests it; nothing is stored unless both succeed.
    /// Callers hold the configure lock.
    async fn connect(&self, config: WrapperConfig) -> Result<String> {
        let WrapperConfig {
            key_id,
            credentials,
        } = config;

        let client = (self.factory)(&credentials).map_err(Error::Connection)?;
        log::debug!("built KMS client with {} credentials", credentials.kind());
        drop(credentials);

        self_test(client.as_ref(), &key_id).await?;
        log::debug!("KMS self-test passed for key {}", key_id);

        self.current_key_id.store(key_id.clone());
        self.key_id.store(Arc::new(key_id.clone()));
        if self.client.set(client).is_err() {
            log::debug!("KMS client already set, keeping the existing one");
        }

        Ok(key_id)
    }
}

/// Builder for [`Wrapper`]
pub struct WrapperBuilder {
    factory: Arc<ClientFactory>,
    env: Arc<dyn EnvSource>,
    envelope: Arc<dyn EnvelopeCipher>,
}

impl WrapperBuilder {
    /// Creates a builder using `factory` to connect to the KMS
    pub fn new(factory: Arc<ClientFactory>) -> Self {
        Self {
            factory,
            env: Arc::new(ProcessEnv),
            envelope: Arc::new(AesGcmEnvelope::new()),
        }
    }

    /// Sets where environment variables are read from
    pub fn with_env(mut self, env: impl EnvSource + 'static) -> Self {
        self.env = Arc::new(env);
        self
    }

    /// Sets the local seal/open primitive
    pub fn with_envelope(mut self, envelope: Arc<dyn EnvelopeCipher>) -> Self {
        self.envelope = envelope;
        self
    }

    /// Builds an unconfigured wrapper
    pub fn build(self) -> Wrapper {
        Wrapper {
            client: OnceLock::new(),
            key_id: ArcSwap::from_pointee(String::new()),
            current_key_id: KeyIdTracker::new(),
            factory: self.factory,
            env: self.env,
            envelope: self.envelope,
            configure: tokio::sync::Mutex::new(()),
        }
    }
}

/// Encrypts and decrypts a fixed value to prove the key id and credentials work together
async fn self_test(client: &dyn SymmetricCryptoClient, key_id: &str) -> Result<()> {
    let start = Instant::now();
    counter!("yckms.wrapper.selftest", 1);

    let encrypted = client
        .encrypt(key_id, SELF_TEST_PLAINTEXT)
        .await
        .map_err(|e| Error::self_test("encrypt error", Some(e)))?;

    let decrypted = Zeroizing::new(
        client
            .decrypt(key_id, &encrypted.ciphertext)
            .await
            .map_err(|e| Error::self_test("decrypt error", Some(e)))?,
    );

    if !bool::from(decrypted.as_slice().ct_eq(SELF_TEST_PLAINTEXT)) {
        return Err(Error::self_test(
            "encrypt/decrypt error: decrypted value differs from the test plaintext",
            None,
        ));
    }

    histogram!("yckms.wrapper.selftest.time", start.elapsed());
    Ok(())
}

#[async_trait]
impl KeyWrapper for Wrapper {
    fn wrapper_type(&self) -> &'static str {
        YANDEXCLOUD_KMS
    }

    fn key_id(&self) -> String {
        self.current_key_id.get()
    }

    fn hmac_key_id(&self) -> String {
        String::new()
    }

    /// Resolves configuration, builds and self-tests the client on first use
    ///
    /// Order of precedence for every field:
    /// * Environment variable
    /// * Value from the config map
    /// * Instance service account (credentials only)
    async fn set_config(
        &self,
        config: Option<&HashMap<String, String>>,
    ) -> Result<HashMap<String, String>> {
        let empty = HashMap::new();
        let config = config.unwrap_or(&empty);

        let _guard = self.configure.lock().await;

        let key_id = if self.client.get().is_none() {
            let resolved = WrapperConfig::resolve(self.env.as_ref(), config)?;
            self.connect(resolved).await?
        } else {
            let key_id = config::resolve_key_id(self.env.as_ref(), config)?;
            let previous = self.key_id.swap(Arc::new(key_id.clone()));
            if *previous != key_id {
                log::debug!("configured key id changed from {} to {}", previous, key_id);
            }
            key_id
        };

        // Non-sensitive configuration info only
        let mut info = HashMap::new();
        info.insert(CFG_KMS_KEY_ID.to_string(), key_id);
        Ok(info)
    }

    async fn encrypt(&self, plaintext: Option<&[u8]>, aad: &[u8]) -> Result<EncryptedBlob> {
        let plaintext = plaintext.ok_or_else(|| {
            Error::InvalidInput("given plaintext for encryption is nil".into())
        })?;
        let client = self.client("encrypt")?;

        let start = Instant::now();

        let env = self.envelope.seal(plaintext, aad)?;

        let key_id = self.key_id.load_full();
        let response = client
            .encrypt(&key_id, &env.key)
            .await
            .map_err(|e| Error::remote("error encrypting data encryption key", e))?;

        // With an alias the KMS reports the underlying key; remember it so callers can
        // notice that the alias moved and re-encrypt older blobs.
        let previous = self.current_key_id.store(response.key_id.clone());
        if !previous.is_empty() && *previous != response.key_id {
            log::debug!("KMS key changed from {} to {}", previous, response.key_id);
        }

        counter!("yckms.wrapper.encrypt", 1);
        histogram!("yckms.wrapper.encrypt.time", start.elapsed());

        Ok(EncryptedBlob {
            ciphertext: env.ciphertext,
            iv: env.iv,
            key_id: response.key_id,
            wrapped_data_key: response.ciphertext,
        })
    }

    async fn decrypt(&self, blob: Option<&EncryptedBlob>, aad: &[u8]) -> Result<Vec<u8>> {
        let blob =
            blob.ok_or_else(|| Error::InvalidInput("given input for decryption is nil".into()))?;
        if blob.wrapped_data_key.is_empty() {
            return Err(Error::InvalidInput(
                "given input for decryption has no wrapped data key".into(),
            ));
        }
        let client = self.client("decrypt")?;

        let start = Instant::now();

        // Unwrap with the configured key id rather than blob.key_id, so an alias can
        // still open data keys wrapped under the keys it pointed to before.
        let key_id = self.key_id.load_full();
        let data_key = Zeroizing::new(
            client
                .decrypt(&key_id, &blob.wrapped_data_key)
                .await
                .map_err(|e| Error::remote("error decrypting data encryption key", e))?,
        );

        let plaintext = self
            .envelope
            .open(&data_key, &blob.iv, &blob.ciphertext, aad)?;

        counter!("yckms.wrapper.decrypt", 1);
        histogram!("yckms.wrapper.decrypt.time", start.elapsed());

        Ok(plaintext)
    }
}
