use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuthError>;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Signing secret is not configured")]
    MissingSecret,

    #[error("Failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("Signature has expired")]
    Expired,

    #[error("Error decoding signature: {0}")]
    Decode(#[source] jsonwebtoken::errors::Error),

    #[error("Invalid Authorization header. No credentials provided")]
    MissingCredentials,

    #[error("Invalid Authorization header. Credentials string should not contain spaces")]
    MalformedHeader,
}
