use thiserror::Error;

/// Error taxonomy for the connection manager (spec §7).
///
/// Each variant's propagation rule is documented in §7's table; most notably
/// `DisconnectFailed` is constructed for logging/event purposes only and is
/// never returned to a `disconnectEndpoint`/`removeEndpoint` caller.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GatewayError {
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("endpoint {0:?} already present in configuration store")]
    EndpointAlreadyInConfig(String),

    #[error("endpoint {0:?} not found")]
    EndpointNotFound(String),

    #[error("connection manager not initialized")]
    NotInitialized,

    #[error("connect failed for {endpoint:?}: {reason}")]
    ConnectFailed { endpoint: String, reason: String },

    #[error("all {attempted} endpoint(s) failed to connect")]
    AllEndpointsFailed { attempted: usize },

    #[error("configuration store error: {0}")]
    ConfigStoreError(String),

    #[error("disconnect failed for {endpoint:?}: {reason}")]
    DisconnectFailed { endpoint: String, reason: String },
}

impl GatewayError {
    /// The endpoint this error concerns, if any — used to tag status events.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            GatewayError::InvalidEndpoint { endpoint, .. } => Some(endpoint),
            GatewayError::EndpointAlreadyInConfig(e) => Some(e),
            GatewayError::EndpointNotFound(e) => Some(e),
            GatewayError::ConnectFailed { endpoint, .. } => Some(endpoint),
            GatewayError::DisconnectFailed { endpoint, .. } => Some(endpoint),
            GatewayError::NotInitialized
            | GatewayError::AllEndpointsFailed { .. }
            | GatewayError::ConfigStoreError(_) => None,
        }
    }
}
