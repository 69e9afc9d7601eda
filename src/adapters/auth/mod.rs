//! Identity verification adapters.
//!
//! - `JwksIdentityVerifier` - Production OIDC/JWKS token validation
//! - `MockIdentityVerifier` - Token map for tests and local development

mod jwks;
mod mock;

pub use jwks::{JwksConfig, JwksIdentityVerifier};
pub use mock::MockIdentityVerifier;
