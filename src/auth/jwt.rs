use crate::models::Claims;
use jsonwebtoken::{DecodingKey, Validation, decode};

/// Tokens are minted by the identity service; this side only verifies them.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenType;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn token(secret: &str) -> String {
        let claims = Claims {
            user_id: 7,
            sub: "ana".into(),
            role: 3,
            exp: 4_102_444_800, // 2100-01-01
            jti: "t-1".into(),
            token_type: TokenType::Access,
            employee_id: Some(1000),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn verifies_with_matching_secret() {
        let claims = verify_token(&token("s3cret"), "s3cret").unwrap();
        assert_eq!(claims.employee_id, Some(1000));
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn rejects_foreign_secret() {
        assert!(verify_token(&token("s3cret"), "other").is_err());
    }
}
