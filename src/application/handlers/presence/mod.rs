//! Connection presence handlers.

mod connect_client;
mod disconnect_client;
mod identity_resolver;

pub use connect_client::{ConnectClientCommand, ConnectClientHandler, ConnectClientResult};
pub use disconnect_client::{DisconnectClientHandler, DisconnectClientResult};
pub use identity_resolver::IdentityResolver;
