//! Service token issuing.
//!
//! Supports the HMAC family (HS256/HS384/HS512) only; both ends of a call
//! share the secret.

use std::str::FromStr;

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::trace;
use zc_config::JwtConfig;

use crate::error::{AuthError, Result};
use crate::roles;

/// Claim set asserting "this call comes from service X with service privileges".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceClaims {
    pub service_name: String,
    pub roles: Vec<String>,
}

impl ServiceClaims {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            roles: roles::to_owned(roles::SERVICE_ROLES),
        }
    }
}

/// Signs service tokens with a pre-shared secret.
///
/// Holds no per-call state: every [`issue`](Self::issue) builds and signs a
/// fresh claim set, so one issuer can be shared across tasks.
#[derive(Clone)]
pub struct ServiceTokenIssuer {
    encoding_key: EncodingKey,
    algorithm: Algorithm,
}

impl std::fmt::Debug for ServiceTokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceTokenIssuer")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl ServiceTokenIssuer {
    pub fn new(secret: &[u8], algorithm: Algorithm) -> Result<Self> {
        if secret.is_empty() {
            return Err(AuthError::MissingSecret);
        }
        ensure_hmac(algorithm)?;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            algorithm,
        })
    }

    pub fn from_config(config: &JwtConfig) -> Result<Self> {
        Self::new(config.secret_key.as_bytes(), parse_algorithm(&config.algorithm)?)
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Build and sign the claim set for `service_name`.
    pub fn issue(&self, service_name: &str) -> Result<String> {
        let claims = ServiceClaims::new(service_name);
        trace!(service = %service_name, "Signing service token");

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(AuthError::Signing)
    }
}

pub(crate) fn parse_algorithm(name: &str) -> Result<Algorithm> {
    let algorithm = Algorithm::from_str(name)
        .map_err(|_| AuthError::UnsupportedAlgorithm(name.to_string()))?;
    ensure_hmac(algorithm)?;
    Ok(algorithm)
}

pub(crate) fn ensure_hmac(algorithm: Algorithm) -> Result<()> {
    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(()),
        other => Err(AuthError::UnsupportedAlgorithm(format!("{:?}", other))),
    }
}
