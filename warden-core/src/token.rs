//! Self-contained access tokens
//!
//! Tokens bind a username to an expiry and are verifiable from signature
//! alone, with no store lookup. Issuing and validating are pure CPU work;
//! nothing in this module suspends.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    config::parse_positive,
    error::{TokenError, ValidationError},
};

pub const ENV_SIGNING_SECRET: &str = "WARDEN_SIGNING_SECRET";
pub const ENV_TOKEN_TTL_MINUTES: &str = "WARDEN_TOKEN_TTL_MINUTES";

/// A signed bearer token in its wire form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        AccessToken(token.into())
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Tokens are credentials; Display exists for handing them to clients, so
// never log them.
impl std::fmt::Display for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Claims carried by an access token
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - the account's username
    pub sub: String,
    /// Issued at in seconds (as UTC timestamp)
    pub iat: i64,
    /// Expiration time in seconds (as UTC timestamp)
    pub exp: i64,
    /// Issuer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Signing algorithm and key material
#[derive(Debug, Clone)]
pub enum TokenAlgorithm {
    /// RS256 - RSA with SHA-256
    RS256 {
        /// Private key for signing tokens (PEM format)
        private_key: Vec<u8>,
        /// Public key for verifying tokens (PEM format)
        public_key: Vec<u8>,
    },
    /// HS256 - HMAC with SHA-256
    HS256 {
        /// Secret key for both signing and verifying
        secret_key: Vec<u8>,
    },
}

/// Configuration for token issuance and validation
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Algorithm and keys
    pub algorithm: TokenAlgorithm,
    /// Issuer claim; enforced on validation when set
    pub issuer: Option<String>,
    /// Token lifetime
    pub ttl: Duration,
}

impl TokenConfig {
    /// Create a new token configuration with HS256 algorithm
    pub fn new_hs256(secret_key: Vec<u8>) -> Self {
        Self {
            algorithm: TokenAlgorithm::HS256 { secret_key },
            issuer: None,
            ttl: Duration::hours(8),
        }
    }

    /// Create a new token configuration with RS256 algorithm
    pub fn new_rs256(private_key: Vec<u8>, public_key: Vec<u8>) -> Self {
        Self {
            algorithm: TokenAlgorithm::RS256 {
                private_key,
                public_key,
            },
            issuer: None,
            ttl: Duration::hours(8),
        }
    }

    /// Create a token configuration with a random HS256 secret key (for testing)
    #[cfg(test)]
    pub fn new_random_hs256() -> Self {
        use rand::TryRngCore;

        let mut secret_key = vec![0u8; 32];
        rand::rng().try_fill_bytes(&mut secret_key).unwrap();
        Self::new_hs256(secret_key)
    }

    /// Set the issuer claim
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Set the token lifetime
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Build a config from the process environment.
    ///
    /// The signing secret is required; the TTL falls back to 8 hours.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_vars(std::env::vars())
    }

    /// Build a config from an explicit set of variables. Backs [`from_env`]
    /// and lets tests inject values without touching the process environment.
    ///
    /// [`from_env`]: TokenConfig::from_env
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Result<Self, Error> {
        let vars: HashMap<String, String> = vars.into_iter().collect();

        let secret = vars
            .get(ENV_SIGNING_SECRET)
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| {
                ValidationError::MissingField(format!("{ENV_SIGNING_SECRET} is required"))
            })?;

        let mut config = Self::new_hs256(secret.clone().into_bytes());
        if let Some(value) = vars.get(ENV_TOKEN_TTL_MINUTES) {
            config.ttl = Duration::minutes(parse_positive(ENV_TOKEN_TTL_MINUTES, value)?);
        }

        Ok(config)
    }

    /// Get the algorithm to use with jsonwebtoken
    pub fn jwt_algorithm(&self) -> Algorithm {
        match &self.algorithm {
            TokenAlgorithm::RS256 { .. } => Algorithm::RS256,
            TokenAlgorithm::HS256 { .. } => Algorithm::HS256,
        }
    }

    /// Get the encoding key for signing
    pub(crate) fn encoding_key(&self) -> Result<EncodingKey, Error> {
        match &self.algorithm {
            TokenAlgorithm::RS256 { private_key, .. } => EncodingKey::from_rsa_pem(private_key)
                .map_err(|e| {
                    ValidationError::InvalidField(format!("Invalid RSA private key: {e}")).into()
                }),
            TokenAlgorithm::HS256 { secret_key } => Ok(EncodingKey::from_secret(secret_key)),
        }
    }

    /// Get the decoding key for verification
    pub(crate) fn decoding_key(&self) -> Result<DecodingKey, Error> {
        match &self.algorithm {
            TokenAlgorithm::RS256 { public_key, .. } => DecodingKey::from_rsa_pem(public_key)
                .map_err(|e| {
                    ValidationError::InvalidField(format!("Invalid RSA public key: {e}")).into()
                }),
            TokenAlgorithm::HS256 { secret_key } => Ok(DecodingKey::from_secret(secret_key)),
        }
    }

    /// Get the validation configuration for token verification
    ///
    /// Leeway is zero: a token expired by one second is already expired.
    pub(crate) fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.jwt_algorithm());
        validation.leeway = 0;
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        validation
    }
}

/// Issues and validates access tokens.
pub struct TokenIssuer {
    config: TokenConfig,
}

impl TokenIssuer {
    pub fn new(config: TokenConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Sign a token for `username`, valid for the configured TTL from `now`.
    pub fn issue(&self, username: &str, now: DateTime<Utc>) -> Result<AccessToken, Error> {
        let claims = Claims {
            sub: username.to_string(),
            iat: now.timestamp(),
            exp: (now + self.config.ttl).timestamp(),
            iss: self.config.issuer.clone(),
        };

        let header = Header::new(self.config.jwt_algorithm());
        let encoding_key = self.config.encoding_key()?;

        let token = encode(&header, &claims, &encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(AccessToken(token))
    }

    /// Validate a token and return its claims.
    ///
    /// Expired and badly signed tokens are reported as their own errors;
    /// everything else the decoder rejects is malformed.
    pub fn validate(&self, token: &str) -> Result<Claims, Error> {
        let decoding_key = self.config.decoding_key()?;
        let validation = self.config.validation();

        let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;

            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed(e.to_string()),
            }
        })?;

        Ok(token_data.claims)
    }
}
