use super::Claims;
use mkw_core::AUTH_TOKEN_DURATION;

pub struct Crypto {
    encoding: jsonwebtoken::EncodingKey,
    decoding: jsonwebtoken::DecodingKey,
}

impl Crypto {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: jsonwebtoken::EncodingKey::from_secret(secret),
            decoding: jsonwebtoken::DecodingKey::from_secret(secret),
        }
    }
    pub fn encode(&self, claims: &Claims) -> Result<String, jsonwebtoken::errors::Error> {
        jsonwebtoken::encode(&jsonwebtoken::Header::default(), claims, &self.encoding)
    }
    pub fn decode(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &jsonwebtoken::Validation::default())
            .map(|data| data.claims)
    }
    pub fn hash(token: &str) -> Vec<u8> {
        use sha2::Digest;
        sha2::Sha256::digest(token.as_bytes()).to_vec()
    }
    pub const fn duration() -> std::time::Duration {
        AUTH_TOKEN_DURATION
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GuildGrant;
    use mkw_core::ID;

    #[test]
    fn claims_round_trip() {
        let crypto = Crypto::new(b"test-secret");
        let mut guilds = std::collections::HashMap::new();
        guilds.insert(
            42,
            GuildGrant {
                is_admin: true,
                can_manage: true,
                guild_name: "Test Guild".to_string(),
            },
        );
        let claims = Claims::new(7, ID::default(), guilds);
        let token = crypto.encode(&claims).unwrap();
        let back = crypto.decode(&token).unwrap();
        assert_eq!(back.user(), 7);
        assert_eq!(back.session(), claims.session());
        assert!(back.can_manage(42));
        assert!(!back.expired());
    }

    #[test]
    fn wrong_secret_rejected() {
        let crypto = Crypto::new(b"right");
        let claims = Claims::new(1, ID::default(), Default::default());
        let token = crypto.encode(&claims).unwrap();
        assert!(Crypto::new(b"wrong").decode(&token).is_err());
    }

    #[test]
    fn hashing_is_stable() {
        assert_eq!(Crypto::hash("abc"), Crypto::hash("abc"));
        assert_ne!(Crypto::hash("abc"), Crypto::hash("abd"));
    }
}
