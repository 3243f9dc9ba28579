//! Platform credentials for one run
//!
//! The four secrets arrive from CI (flags or environment variables) and are
//! held in `SecretString`s so they are zeroed on drop and never show up in
//! `Debug` output.

use secrecy::{ExposeSecret, SecretString};

use crate::error::{ConfigError, Result};

pub const CONSUMER_KEY_ENV: &str = "THREADCAST_CONSUMER_KEY";
pub const CONSUMER_SECRET_ENV: &str = "THREADCAST_CONSUMER_SECRET";
pub const ACCESS_TOKEN_ENV: &str = "THREADCAST_ACCESS_TOKEN";
pub const ACCESS_TOKEN_SECRET_ENV: &str = "THREADCAST_ACCESS_TOKEN_SECRET";

#[derive(Debug)]
pub struct Credentials {
    pub consumer_key: SecretString,
    pub consumer_secret: SecretString,
    pub access_token: SecretString,
    pub access_token_secret: SecretString,
}

impl Credentials {
    /// Assemble credentials, requiring all four values to be present and non-empty
    pub fn from_parts(
        consumer_key: Option<String>,
        consumer_secret: Option<String>,
        access_token: Option<String>,
        access_token_secret: Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            consumer_key: required("consumer key", CONSUMER_KEY_ENV, consumer_key)?,
            consumer_secret: required("consumer secret", CONSUMER_SECRET_ENV, consumer_secret)?,
            access_token: required("access token", ACCESS_TOKEN_ENV, access_token)?,
            access_token_secret: required(
                "access token secret",
                ACCESS_TOKEN_SECRET_ENV,
                access_token_secret,
            )?,
        })
    }

    /// Read all four values from the `THREADCAST_*` environment variables
    pub fn from_env() -> Result<Self> {
        let var = |name: &str| std::env::var(name).ok();
        Self::from_parts(
            var(CONSUMER_KEY_ENV),
            var(CONSUMER_SECRET_ENV),
            var(ACCESS_TOKEN_ENV),
            var(ACCESS_TOKEN_SECRET_ENV),
        )
    }

    pub fn access_token(&self) -> &str {
        self.access_token.expose_secret()
    }
}

fn required(label: &str, env: &str, value: Option<String>) -> Result<SecretString> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(SecretString::from(v)),
        _ => Err(ConfigError::MissingField(format!("{} (set {})", label, env)).into()),
    }
}
