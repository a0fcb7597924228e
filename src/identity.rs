use axum::http::{HeaderMap, header::AUTHORIZATION};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::VoteError;

/// Identity a vote is deduplicated against: an authenticated user or a
/// guest device. Resolved once at the boundary, consumed uniformly after.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VoterKey {
    User(Uuid),
    Guest(String),
}

impl fmt::Display for VoterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoterKey::User(id) => write!(f, "user:{id}"),
            VoterKey::Guest(device_id) => write!(f, "guest:{device_id}"),
        }
    }
}

/// Claims carried by bearer tokens issued by the external auth service.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

pub struct IdentityResolver {
    decoding: DecodingKey,
    validation: Validation,
}

impl IdentityResolver {
    pub fn new(secret: &str) -> Self {
        IdentityResolver {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// A present bearer token must be valid; it never falls back to the
    /// guest id. Without a token, a non-empty guest device id resolves to a
    /// guest key.
    pub fn resolve(
        &self,
        bearer: Option<&str>,
        guest_id: Option<&str>,
    ) -> Result<VoterKey, VoteError> {
        if let Some(token) = bearer {
            let data = decode::<Claims>(token, &self.decoding, &self.validation)
                .map_err(|_| VoteError::InvalidIdentity)?;
            let user_id =
                Uuid::parse_str(&data.claims.sub).map_err(|_| VoteError::InvalidIdentity)?;
            return Ok(VoterKey::User(user_id));
        }

        match guest_id {
            Some(device_id) if !device_id.trim().is_empty() => {
                Ok(VoterKey::Guest(device_id.to_string()))
            }
            _ => Err(VoteError::InvalidIdentity),
        }
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    const SECRET: &str = "test-secret";

    fn token_for(sub: &str, exp: usize) -> String {
        encode(
            &Header::default(),
            &Claims {
                sub: sub.to_string(),
                exp,
            },
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_resolves_to_user() {
        let resolver = IdentityResolver::new(SECRET);
        let user_id = Uuid::new_v4();
        let token = token_for(&user_id.to_string(), 4102444800);

        let key = resolver.resolve(Some(&token), None).unwrap();
        assert_eq!(key, VoterKey::User(user_id));
    }

    #[test]
    fn token_wins_over_guest_id() {
        let resolver = IdentityResolver::new(SECRET);
        let user_id = Uuid::new_v4();
        let token = token_for(&user_id.to_string(), 4102444800);

        let key = resolver.resolve(Some(&token), Some("device-1")).unwrap();
        assert_eq!(key, VoterKey::User(user_id));
    }

    #[test]
    fn invalid_token_fails_even_with_guest_id() {
        let resolver = IdentityResolver::new(SECRET);
        let result = resolver.resolve(Some("not-a-jwt"), Some("device-1"));
        assert!(matches!(result, Err(VoteError::InvalidIdentity)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let resolver = IdentityResolver::new(SECRET);
        let token = token_for(&Uuid::new_v4().to_string(), 1);
        let result = resolver.resolve(Some(&token), None);
        assert!(matches!(result, Err(VoteError::InvalidIdentity)));
    }

    #[test]
    fn guest_id_resolves_without_token() {
        let resolver = IdentityResolver::new(SECRET);
        let key = resolver.resolve(None, Some("device-7")).unwrap();
        assert_eq!(key, VoterKey::Guest("device-7".to_string()));
    }

    #[test]
    fn missing_identity_is_rejected() {
        let resolver = IdentityResolver::new(SECRET);
        assert!(matches!(
            resolver.resolve(None, None),
            Err(VoteError::InvalidIdentity)
        ));
        assert!(matches!(
            resolver.resolve(None, Some("   ")),
            Err(VoteError::InvalidIdentity)
        ));
    }

    #[test]
    fn voter_keys_have_distinct_storage_encodings() {
        let id = Uuid::new_v4();
        assert_eq!(VoterKey::User(id).to_string(), format!("user:{id}"));
        assert_eq!(
            VoterKey::Guest("abc".to_string()).to_string(),
            "guest:abc"
        );
    }
}
