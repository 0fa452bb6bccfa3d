//! Network collaborators for `campus-chat`: the REST backend, the WebSocket
//! gateway and the remember-me credential file.

pub mod credentials;
pub mod error;
pub mod gateway;
pub mod rest;

pub use credentials::{CredentialStore, StoredCredentials};
pub use error::{ClientError, CredentialError};
pub use gateway::{GatewayConfig, GatewayTransport};
pub use rest::RestClient;
