//! JWT service for bearer token issuance and verification
//!
//! Tokens are HS256-signed claim sets carrying the username as subject and
//! an absolute expiry. Verification is a pure function of the token, the
//! process-wide secret and the current time; nothing is stored server side.

use chrono::{DateTime, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Lifetime of a token when the caller does not ask for one
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);

/// Development-only signing secret used when `SECRET_KEY` is unset
pub const INSECURE_DEFAULT_SECRET: &str = "your-secret-key-change-this-in-production";

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC secret used to sign and verify tokens
    pub secret_key: String,
    /// Lifetime of tokens handed out by the login flow (default: 30 minutes)
    pub access_token_expiry: Duration,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `SECRET_KEY`: HMAC signing secret (insecure development default when unset)
    /// - `ACCESS_TOKEN_EXPIRE_MINUTES`: Login token lifetime in minutes (default: 30)
    pub fn from_env() -> Self {
        let secret_key = std::env::var("SECRET_KEY")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| INSECURE_DEFAULT_SECRET.to_string());

        let minutes: u64 = std::env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);

        JwtConfig {
            secret_key,
            access_token_expiry: Duration::from_secs(minutes.saturating_mul(60)),
        }
    }

    /// Whether the signing secret is the insecure development default
    pub fn uses_insecure_secret(&self) -> bool {
        self.secret_key == INSECURE_DEFAULT_SECRET
    }
}

/// JWT claims structure
///
/// Every field is optional on the way in so that a token with missing
/// claims is reported as such instead of as an undecodable token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username of the token holder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Issued at, seconds since the Unix epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Expiration, seconds since the Unix epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Reasons a token is rejected
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("token claims are missing the subject or expiry")]
    MalformedClaims,

    #[error("token could not be decoded: {0}")]
    Malformed(String),

    #[error("token could not be signed: {0}")]
    Signing(String),
}

/// JWT service
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl TokenService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret_key.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret_key.as_bytes());

        // Expiry is checked by hand against an explicit instant, without leeway.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        TokenService {
            encoding_key,
            decoding_key,
            validation,
            config,
        }
    }

    /// Lifetime of tokens issued by the login flow
    pub fn access_token_expiry(&self) -> Duration {
        self.config.access_token_expiry
    }

    /// Issue a token for `subject`, valid for `ttl` (15 minutes when `None`)
    pub fn issue(&self, subject: &str, ttl: Option<Duration>) -> Result<String, TokenError> {
        self.issue_at(subject, ttl, Utc::now())
    }

    /// Issue a token as if the current time were `now`
    pub fn issue_at(
        &self,
        subject: &str,
        ttl: Option<Duration>,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let ttl = ttl.unwrap_or(DEFAULT_TOKEN_TTL);
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);

        let claims = Claims {
            sub: Some(subject.to_string()),
            iat: Some(now.timestamp()),
            exp: Some(now.timestamp().saturating_add(ttl_secs)),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify a token and return its subject
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token as if the current time were `now`
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    _ => TokenError::Malformed(e.to_string()),
                }
            })?;

        let claims = token_data.claims;
        let subject = claims
            .sub
            .filter(|s| !s.is_empty())
            .ok_or(TokenError::MalformedClaims)?;
        let exp = claims.exp.ok_or(TokenError::MalformedClaims)?;

        if now.timestamp() >= exp {
            warn!("Token for '{}' expired at {}", subject, exp);
            return Err(TokenError::Expired);
        }

        Ok(subject)
    }
}
