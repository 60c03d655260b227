use jsonwebtoken::{DecodingKey, Validation, decode, errors::Error};

use crate::models::Claims;

/// Decodes and validates an HS256 bearer token, including its expiry.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenType;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn token(secret: &str, exp_offset: i64, token_type: TokenType) -> String {
        let claims = Claims {
            user_id: 3,
            sub: "jdoe".to_string(),
            role: 3,
            exp: (chrono::Utc::now().timestamp() + exp_offset) as usize,
            jti: "test-jti".to_string(),
            token_type,
            employee_id: Some(1000),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_token() {
        let claims = verify_token(&token("s3cret", 600, TokenType::Access), "s3cret").unwrap();
        assert_eq!(claims.sub, "jdoe");
        assert_eq!(claims.employee_id, Some(1000));
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn test_wrong_secret() {
        assert!(verify_token(&token("s3cret", 600, TokenType::Access), "other").is_err());
    }

    #[test]
    fn test_expired_token() {
        // Beyond the default 60s leeway.
        assert!(verify_token(&token("s3cret", -3600, TokenType::Access), "s3cret").is_err());
    }
}
