//! Data model and error taxonomy shared by the connection-manager crates.
//!
//! This crate owns nothing that moves bytes — no sockets, no files, no
//! channels — only the types the rest of the workspace agrees on: the
//! validated endpoint URL, per-endpoint lifecycle state, manager-wide
//! options, the event payloads published to the outside world, and the
//! error taxonomy every fallible operation returns.

pub mod endpoint;
pub mod error;
pub mod events;
pub mod options;
pub mod state;
pub mod validate;

pub use endpoint::EndpointUrl;
pub use error::GatewayError;
pub use events::{ConfigChangeEvent, ConfigChangeKind, EndpointStatusEvent, Operation};
pub use options::{parse_options_patch, Options, OptionsPatch};
pub use state::ConnectionState;
pub use validate::{partition_endpoints, validate_endpoint};
