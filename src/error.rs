/// Typed failures for cluster object mutations
use thiserror::Error;

/// Errors raised while reading, transforming or writing a cluster object
#[derive(Debug, Error)]
pub enum MutateError {
    /// The object does not exist
    #[error("{kind} {name} not found")]
    NotFound { kind: String, name: String },

    /// The write carried a stale resourceVersion
    #[error("{kind} {name} was modified concurrently: {message}")]
    VersionConflict {
        kind: String,
        name: String,
        message: String,
    },

    /// User-supplied input could not be interpreted
    #[error("malformed input {input:?}: {reason}")]
    MalformedInput { input: String, reason: String },

    /// Every attempt lost the race against another writer
    #[error("update of {kind} {name} failed after {attempts} attempts")]
    ExhaustedRetries {
        kind: String,
        name: String,
        attempts: u32,
        #[source]
        last: Box<MutateError>,
    },

    /// The cluster client could not be built
    #[error("failed to build cluster client: {0}")]
    Transport(String),

    /// The object lacks a field group the mutation needs
    #[error("{kind} {name} has no {field}")]
    MissingField {
        kind: String,
        name: String,
        field: &'static str,
    },

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Any other API or network failure
    #[error("request for {kind} {name} failed")]
    Request {
        kind: String,
        name: String,
        #[source]
        source: kube::Error,
    },
}

impl MutateError {
    /// Map a kube client error onto the taxonomy, keyed by the status code
    pub fn from_kube(err: kube::Error, kind: &str, name: &str) -> Self {
        match err {
            kube::Error::Api(response) if response.code == 404 => MutateError::NotFound {
                kind: kind.to_string(),
                name: name.to_string(),
            },
            kube::Error::Api(response) if response.code == 409 => MutateError::VersionConflict {
                kind: kind.to_string(),
                name: name.to_string(),
                message: response.message,
            },
            source => MutateError::Request {
                kind: kind.to_string(),
                name: name.to_string(),
                source,
            },
        }
    }

    /// Whether the failure may succeed on a fresh read-modify-write cycle
    pub fn is_conflict(&self) -> bool {
        matches!(self, MutateError::VersionConflict { .. })
    }
}
