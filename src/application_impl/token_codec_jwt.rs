use crate::application_port::*;
use crate::domain_model::*;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, decode_header, encode,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub access_secret: Vec<u8>,
    pub refresh_secret: Vec<u8>,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
    iat: i64,
    iss: String,
    aud: String,
    typ: TokenClass,
    jti: String, // keeps two tokens minted in the same second distinct
}

/// HS256 codec with one secret per token class.
pub struct JwtCodec {
    cfg: JwtConfig,
    clock: Arc<dyn Clock>,
    validation: Validation,
}

impl JwtCodec {
    pub fn new(cfg: JwtConfig, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against `clock`, strictly, after the signature.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
        validation.set_audience(&[cfg.audience.as_str()]);
        validation.set_issuer(&[cfg.issuer.as_str()]);

        JwtCodec {
            cfg,
            clock,
            validation,
        }
    }

    fn secret(&self, class: TokenClass) -> &[u8] {
        match class {
            TokenClass::Access => &self.cfg.access_secret,
            TokenClass::Refresh => &self.cfg.refresh_secret,
        }
    }

    #[inline]
    fn gen_jti() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn timestamp(secs: i64, claim: &str) -> Result<DateTime<Utc>, CodecError> {
        DateTime::<Utc>::from_timestamp(secs, 0)
            .ok_or_else(|| CodecError::MalformedClaims(format!("{claim} out of range")))
    }
}

fn map_decode_error(e: jsonwebtoken::errors::Error) -> CodecError {
    match e.kind() {
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidToken
        | ErrorKind::Base64(_)
        | ErrorKind::Utf8(_) => CodecError::InvalidSignature,
        ErrorKind::ExpiredSignature => CodecError::Expired,
        _ => CodecError::MalformedClaims(e.to_string()),
    }
}

impl TokenCodec for JwtCodec {
    fn issue(
        &self,
        class: TokenClass,
        user_id: &UserId,
        ttl: Duration,
    ) -> Result<IssuedToken, CodecError> {
        let secret = self.secret(class);
        if secret.is_empty() {
            return Err(CodecError::Signing(format!("empty {class} secret")));
        }
        if ttl.as_secs() == 0 {
            return Err(CodecError::Signing(format!(
                "{class} ttl must be at least one second"
            )));
        }
        if user_id.is_empty() {
            return Err(CodecError::Signing("empty subject".to_string()));
        }

        let ttl_secs = i64::try_from(ttl.as_secs())
            .map_err(|_| CodecError::Signing(format!("{class} ttl out of range")))?;
        let iat = self.clock.now().timestamp();
        let exp = iat
            .checked_add(ttl_secs)
            .ok_or_else(|| CodecError::Signing(format!("{class} expiry out of range")))?;
        let issued_at = DateTime::<Utc>::from_timestamp(iat, 0)
            .ok_or_else(|| CodecError::Signing("issued-at out of range".to_string()))?;
        let expires_at = DateTime::<Utc>::from_timestamp(exp, 0)
            .ok_or_else(|| CodecError::Signing(format!("{class} expiry out of range")))?;

        let claims = Claims {
            sub: user_id.to_string(),
            exp,
            iat,
            iss: self.cfg.issuer.clone(),
            aud: self.cfg.audience.clone(),
            typ: class,
            jti: Self::gen_jti(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .map_err(|e| CodecError::Signing(e.to_string()))?;

        Ok(IssuedToken {
            token,
            issued_at,
            expires_at,
        })
    }

    fn verify(&self, class: TokenClass, token: &str) -> Result<TokenClaims, CodecError> {
        // Reject anything but HS256 before touching the key, so a token
        // declaring `none` or another algorithm never reaches verification.
        let header = decode_header(token).map_err(|_| CodecError::InvalidSignature)?;
        if header.alg != Algorithm::HS256 {
            return Err(CodecError::InvalidSignature);
        }

        let secret = self.secret(class);
        if secret.is_empty() {
            return Err(CodecError::InvalidSignature);
        }

        let data = decode::<Claims>(token, &DecodingKey::from_secret(secret), &self.validation)
            .map_err(map_decode_error)?;
        let claims = data.claims;

        if claims.typ != class {
            return Err(CodecError::MalformedClaims(format!(
                "expected {class} token, got {}",
                claims.typ
            )));
        }
        if claims.sub.is_empty() {
            return Err(CodecError::MalformedClaims("empty subject".to_string()));
        }
        if self.clock.now().timestamp() >= claims.exp {
            return Err(CodecError::Expired);
        }

        Ok(TokenClaims {
            user_id: UserId(claims.sub),
            issued_at: Self::timestamp(claims.iat, "iat")?,
            expires_at: Self::timestamp(claims.exp, "exp")?,
            jti: claims.jti,
        })
    }
}
