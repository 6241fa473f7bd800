//! Authentication primitives shared by every ZeroCater service.
//!
//! - [`ServiceTokenIssuer`] signs the short-lived token a service attaches
//!   to outbound calls (`Authorization: JWT <token>`).
//! - [`TokenVerifier`] is the receiving side: it parses the header and
//!   checks the signature with the same shared secret.
//! - [`roles`] holds the actor vocabulary carried in the `roles` claim.

mod error;
mod issuer;
pub mod roles;
mod verify;

pub use error::{AuthError, Result};
pub use issuer::{ServiceClaims, ServiceTokenIssuer};
pub use verify::{extract_token, AuthenticatedUser, TokenVerifier};
