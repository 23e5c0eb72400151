use axum::http::{HeaderMap, header};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use thiserror::Error;

use social_types::api::{CLAIMS_VERSION, Claims};

/// Tokens are valid for six hours from issuance.
const TOKEN_TTL_HOURS: i64 = 6;

const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("malformed token")]
    Malformed,

    #[error("token signature mismatch")]
    SignatureMismatch,

    #[error("signing secret is not configured")]
    MissingSecret,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Issues and validates HS256 bearer tokens with a secret fixed at startup.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenService {
    pub fn new(secret: &str) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }

        // Only HS256 is accepted; a token claiming any other algorithm fails
        // before its signature is looked at.
        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    pub fn issue(&self, user_id: i64) -> Result<String, TokenError> {
        self.issue_at(user_id, Utc::now())
    }

    /// Issue a token as if it were minted at `now`.
    pub fn issue_at(&self, user_id: i64, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = Claims {
            ver: CLAIMS_VERSION,
            sub: user_id,
            authorized: true,
            exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        };

        encode(&Header::new(ALGORITHM), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Check signature, algorithm, expiry and claims layout.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        if token.is_empty() {
            return Err(TokenError::Malformed);
        }

        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::SignatureMismatch
                }
                _ => TokenError::Malformed,
            }
        })?;

        let claims = data.claims;
        if claims.ver != CLAIMS_VERSION || !claims.authorized {
            return Err(TokenError::Malformed);
        }

        Ok(claims)
    }

    /// Validate and return the user the token was issued to.
    pub fn extract_subject(&self, token: &str) -> Result<i64, TokenError> {
        self.validate(token).map(|claims| claims.sub)
    }
}

/// Pull the token out of `Authorization: Bearer <token>`.
///
/// The header must split on single spaces into exactly two parts. Anything else
/// yields an empty string, which [`TokenService::validate`] rejects as malformed.
pub fn bearer_token(headers: &HeaderMap) -> &str {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) => token,
        _ => "",
    }
}
