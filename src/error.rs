use thiserror::Error;

/// Result type for wrapper operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed cause carried by errors that come from collaborators (KMS transport, SDK session)
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while configuring or using the wrapper
#[derive(Error, Debug)]
pub enum Error {
    /// Missing, ambiguous or unreadable configuration. Never retried.
    #[error("configuration error: {0}")]
    Config(String),

    /// The KMS client session could not be built from the resolved credentials
    #[error("error initializing Yandex.Cloud KMS wrapping client: {0}")]
    Connection(#[source] BoxError),

    /// The encrypt/decrypt round trip against the configured key failed
    #[error("KMS self-test failed: {reason}")]
    SelfTest {
        reason: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Absent plaintext or blob
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Encrypt or decrypt was called before a successful `set_config`
    #[error("cannot {0}: wrapper is not configured, no KMS client")]
    NotConfigured(&'static str),

    /// A remote KMS call failed
    #[error("{context}: {source}")]
    Remote {
        context: &'static str,
        #[source]
        source: BoxError,
    },

    /// Local sealing of the plaintext failed
    #[error("error wrapping data: {0}")]
    Seal(String),

    /// Local opening failed: wrong key, wrong AAD, or tampered input
    #[error("error decrypting data: {0}")]
    Open(String),
}

impl Error {
    pub(crate) fn remote(context: &'static str, source: BoxError) -> Self {
        Error::Remote { context, source }
    }

    pub(crate) fn self_test(reason: impl Into<String>, source: Option<BoxError>) -> Self {
        Error::SelfTest {
            reason: reason.into(),
            source,
        }
    }
}
