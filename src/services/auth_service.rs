//! Authentication service: credential verification and JWT issuance.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::{AppError, Result};
use crate::models::user::User;

/// JWT claims carried by every issued token.
///
/// Role names are a snapshot from login time; authorization checks always
/// re-resolve against the database rather than trusting this list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub email: String,
    pub roles: Vec<String>,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct AuthService {
    db: SqlitePool,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_hours: i64,
}

impl AuthService {
    pub fn new(db: SqlitePool, jwt_secret: &str, expiry_hours: i64) -> Self {
        Self {
            db,
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            expiry_hours,
        }
    }

    /// Verify credentials and issue a token.
    ///
    /// Inactive accounts and unknown emails fail the same way as a bad
    /// password so the response does not reveal which part was wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, String)> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE email = ? AND is_active = 1",
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        if !Self::verify_password(password, &user.password_hash)? {
            return Err(AppError::Authentication(
                "Invalid email or password".to_string(),
            ));
        }

        let roles = self.role_names(user.id).await?;
        let token = self.generate_token(&user, roles)?;
        Ok((user, token))
    }

    /// Issue a signed token for the given user.
    pub fn generate_token(&self, user: &User, roles: Vec<String>) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            roles,
            iat: now.timestamp(),
            exp: (now + chrono::Duration::hours(self.expiry_hours)).timestamp(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    /// Decode and verify a token, returning its claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())?;
        Ok(data.claims)
    }

    async fn role_names(&self, user_id: i64) -> Result<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>(
            r#"
            SELECT r.name FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = ?
            ORDER BY r.hierarchy_level DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(names)
    }

    pub fn hash_password(password: &str) -> Result<String> {
        Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
    }

    pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
        Ok(bcrypt::verify(password, hash)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hashing() {
        let password = "test_password_123";
        let hash = AuthService::hash_password(password).unwrap();

        assert_ne!(password, hash);
        assert!(AuthService::verify_password(password, &hash).unwrap());
        assert!(!AuthService::verify_password("wrong_password", &hash).unwrap());
    }
}
