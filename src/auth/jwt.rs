use crate::models::{Claims, TokenType};
use jsonwebtoken::{DecodingKey, Validation, decode};

/// Decodes and validates an access token. Refresh tokens are refused.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())?;

    if claims.token_type != TokenType::Access {
        return Err("Refresh tokens cannot be used for API calls".to_string());
    }
    Ok(claims)
}

#[cfg(test)]
pub fn generate_token(
    user_id: &str,
    email: &str,
    name: &str,
    role: u8,
    token_type: TokenType,
    secret: &str,
    ttl: i64,
) -> String {
    use jsonwebtoken::{EncodingKey, Header, encode};
    use uuid::Uuid;

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        name: name.to_string(),
        role,
        exp: (chrono::Utc::now().timestamp() + ttl) as usize,
        jti: Uuid::new_v4().to_string(),
        token_type,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn access_token_round_trips() {
        let token = generate_token("u1", "u1@company.com", "Name u1", 2, TokenType::Access, SECRET, 900);
        let claims = verify_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.role, 2);
    }

    #[test]
    fn refresh_token_is_refused() {
        let token = generate_token("u1", "u1@company.com", "Name u1", 3, TokenType::Refresh, SECRET, 900);
        assert!(verify_token(&token, SECRET).is_err());
    }

    #[test]
    fn wrong_secret_and_expired_tokens_fail() {
        let token = generate_token("u1", "u1@company.com", "Name u1", 3, TokenType::Access, SECRET, 900);
        assert!(verify_token(&token, "other").is_err());

        // beyond the default 60s leeway
        let expired = generate_token("u1", "u1@company.com", "Name u1", 3, TokenType::Access, SECRET, -600);
        assert!(verify_token(&expired, SECRET).is_err());
    }
}
