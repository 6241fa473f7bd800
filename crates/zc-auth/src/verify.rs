//! Token verification for incoming calls.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};
use zc_config::JwtConfig;

use crate::error::{AuthError, Result};
use crate::issuer::{ensure_hmac, parse_algorithm};
use crate::roles;

/// Pull the raw token out of an `Authorization` header value.
///
/// Returns `Ok(None)` when there is no header or it uses another scheme, so
/// callers can fall through to a different authentication method.
pub fn extract_token<'a>(header: Option<&'a str>, prefix: &str) -> Result<Option<&'a str>> {
    let Some(header) = header else {
        return Ok(None);
    };

    let mut parts = header.split_whitespace();
    match parts.next() {
        Some(scheme) if scheme.eq_ignore_ascii_case(prefix) => {}
        _ => return Ok(None),
    }

    let token = parts.next().ok_or(AuthError::MissingCredentials)?;
    if parts.next().is_some() {
        return Err(AuthError::MalformedHeader);
    }

    Ok(Some(token))
}

/// The principal behind a verified token, user or service.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedUser {
    /// Taken from `pk`, falling back to `id`. Absent for service tokens.
    pub id: Option<String>,
    pub roles: Vec<String>,
    pub service_name: Option<String>,
    /// Every other claim, untouched
    pub extra: Map<String, Value>,
}

impl AuthenticatedUser {
    fn from_claims(mut claims: Map<String, Value>) -> Self {
        let pk = claims.remove("pk").and_then(scalar_to_string);
        let id = claims.remove("id").and_then(scalar_to_string);

        let roles = match claims.remove("roles") {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        };

        let service_name = match claims.remove("serviceName") {
            Some(Value::String(name)) => Some(name),
            _ => None,
        };

        Self {
            id: pk.or(id),
            roles,
            service_name,
            extra: claims,
        }
    }

    pub fn is_staff(&self) -> bool {
        roles::is_staff(&self.roles)
    }

    pub fn is_user(&self) -> bool {
        roles::is_user(&self.roles)
    }

    pub fn is_service(&self) -> bool {
        roles::is_service(&self.roles)
    }

    pub fn is_anonymous(&self) -> bool {
        roles::is_anonymous(&self.roles)
    }
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Checks token signatures against the shared secret.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
    header_prefix: String,
}

impl TokenVerifier {
    /// Same constraints as the issuing side: a non-empty secret and an HMAC
    /// algorithm.
    pub fn new(
        secret: &[u8],
        algorithm: Algorithm,
        header_prefix: impl Into<String>,
    ) -> Result<Self> {
        if secret.is_empty() {
            return Err(AuthError::MissingSecret);
        }
        ensure_hmac(algorithm)?;

        let mut validation = Validation::new(algorithm);
        // Service tokens carry no registered claims; `exp` is still enforced
        // whenever a token does include it.
        validation.required_spec_claims.clear();
        validation.validate_aud = false;

        Ok(Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            header_prefix: header_prefix.into(),
        })
    }

    pub fn from_config(config: &JwtConfig) -> Result<Self> {
        Self::new(
            config.secret_key.as_bytes(),
            parse_algorithm(&config.algorithm)?,
            config.auth_header_prefix.clone(),
        )
    }

    pub fn verify(&self, token: &str) -> Result<AuthenticatedUser> {
        let data = decode::<Map<String, Value>>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Decode(e),
            })?;

        Ok(AuthenticatedUser::from_claims(data.claims))
    }

    /// Verify the token carried by an `Authorization` header value.
    ///
    /// `Ok(None)` means the header did not use this verifier's scheme.
    pub fn authenticate(&self, header: Option<&str>) -> Result<Option<AuthenticatedUser>> {
        match extract_token(header, &self.header_prefix)? {
            Some(token) => self.verify(token).map(Some),
            None => Ok(None),
        }
    }
}
