//! Key-pair JWT for the ingest service
//!
//! Snowpipe's REST endpoint authenticates with an RS256 JWT whose issuer is
//! `<ACCOUNT>.<USER>.SHA256:<public-key-fingerprint>` and whose subject is
//! `<ACCOUNT>.<USER>`. Tokens are cached and re-signed shortly before expiry.

use crate::config::SnowflakeConfig;
use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use tokio::sync::RwLock;

/// Signed tokens live just under the service's one-hour maximum
const TOKEN_LIFETIME_MINUTES: i64 = 59;
/// Re-sign when this close to expiry
const RENEWAL_MARGIN_MINUTES: i64 = 5;

#[derive(Serialize)]
struct Claims {
    iss: String,
    sub: String,
    iat: i64,
    exp: i64,
}

struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn needs_renewal(&self) -> bool {
        Utc::now() + Duration::minutes(RENEWAL_MARGIN_MINUTES) >= self.expires_at
    }
}

/// RS256 signer bound to one account/user key pair
pub struct KeyPairAuth {
    issuer: String,
    subject: String,
    encoding_key: EncodingKey,
    cached: RwLock<Option<CachedToken>>,
}

impl KeyPairAuth {
    /// Build a signer from the loaded configuration.
    ///
    /// Fails fast on an unparseable private key, before any request is made.
    pub fn new(config: &SnowflakeConfig) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(config.private_key_pem.as_bytes())?;
        let subject = config.qualified_username();
        let fingerprint = if config.public_key_fp.starts_with("SHA256:") {
            config.public_key_fp.clone()
        } else {
            format!("SHA256:{}", config.public_key_fp)
        };
        Ok(Self {
            issuer: format!("{subject}.{fingerprint}"),
            subject,
            encoding_key,
            cached: RwLock::new(None),
        })
    }

    /// The JWT issuer string
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Return a valid token, re-signing if the cached one is near expiry
    pub async fn token(&self) -> Result<String> {
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref() {
                if !token.needs_renewal() {
                    return Ok(token.token.clone());
                }
            }
        }

        let mut cached = self.cached.write().await;
        // Another caller may have re-signed while we waited for the lock.
        if let Some(token) = cached.as_ref() {
            if !token.needs_renewal() {
                return Ok(token.token.clone());
            }
        }

        let now = Utc::now();
        let expires_at = now + Duration::minutes(TOKEN_LIFETIME_MINUTES);
        let claims = Claims {
            iss: self.issuer.clone(),
            sub: self.subject.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)?;
        *cached = Some(CachedToken {
            token: token.clone(),
            expires_at,
        });
        Ok(token)
    }
}
