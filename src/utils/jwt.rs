use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};

use crate::errors::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User identity
    pub exp: usize,  // Expiration timestamp
}

/// HMAC secret shared with whatever issues the tokens.
#[derive(Clone)]
pub struct JwtSecret(pub String);

pub fn validate_token(token: &str, secret: &JwtSecret) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.0.as_bytes()),
        &Validation::new(jsonwebtoken::Algorithm::HS256),
    )
    .map(|data| data.claims)
}

#[cfg(test)]
pub fn generate_token(subject: &str, secret: &JwtSecret) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let expiration = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::days(7))
        .expect("Invalid timestamp")
        .timestamp() as usize;

    let claims = Claims {
        sub: subject.to_string(),
        exp: expiration,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.0.as_bytes()))
        .expect("token encodes")
}

/// Any caller holding a valid bearer token.
#[derive(Debug)]
pub struct AuthenticatedUser {
    pub subject: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
    let secret = req
        .app_data::<web::Data<JwtSecret>>()
        .ok_or_else(|| AppError::InternalServerError("JWT secret is not configured".to_string()))?;

    let token = req
        .headers()
        .get("Authorization")
        .and_then(|auth| auth.to_str().ok())
        .and_then(|auth| auth.split_whitespace().nth(1))
        .ok_or_else(|| AppError::Unauthorized("Missing token".to_string()))?;

    let claims = validate_token(token, secret)
        .map_err(|err| AppError::Unauthorized(err.to_string()))?;

    Ok(AuthenticatedUser { subject: claims.sub })
}
