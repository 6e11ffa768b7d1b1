use actix_web::{dev::Payload, web, FromRequest, HttpRequest, HttpResponse};
use bcrypt::verify;
use chrono::{Duration, Utc};
use futures_util::future::{ready, Ready};
use jsonwebtoken::{decode, encode, errors::Error as JwtError, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::ApiError;
use crate::handlers::AppState;

const ADMIN_SUBJECT: &str = "admin";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

/// Admin secret plus the signing keys for access and refresh tokens.
pub struct AuthKeys {
    password_hash: String,
    access_secret: Vec<u8>,
    refresh_secret: Vec<u8>,
}

impl AuthKeys {
    pub fn new(password_hash: String, access_secret: &str, refresh_secret: &str) -> Self {
        AuthKeys {
            password_hash,
            access_secret: access_secret.as_bytes().to_vec(),
            refresh_secret: refresh_secret.as_bytes().to_vec(),
        }
    }

    pub fn check_password(&self, password: &str) -> Result<bool, ApiError> {
        verify(password, &self.password_hash).map_err(|e| {
            error!("Password verification error: {}", e);
            ApiError::Internal("Password verification failed".into())
        })
    }

    pub fn generate_tokens(&self) -> Result<AuthResponse, ApiError> {
        let now = Utc::now();

        // Access token (2 hours)
        let access_claims = Claims {
            sub: ADMIN_SUBJECT.to_string(),
            exp: (now + Duration::hours(2)).timestamp(),
            iat: now.timestamp(),
        };

        // Refresh token (7 days)
        let refresh_claims = Claims {
            sub: ADMIN_SUBJECT.to_string(),
            exp: (now + Duration::days(7)).timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(
            &Header::default(),
            &access_claims,
            &EncodingKey::from_secret(&self.access_secret),
        )
        .map_err(|e| {
            error!("Token generation error: {}", e);
            ApiError::Internal("Token generation failed".into())
        })?;

        let refresh_token = encode(
            &Header::default(),
            &refresh_claims,
            &EncodingKey::from_secret(&self.refresh_secret),
        )
        .map_err(|e| {
            error!("Refresh token generation error: {}", e);
            ApiError::Internal("Refresh token generation failed".into())
        })?;

        Ok(AuthResponse {
            token,
            refresh_token,
        })
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, JwtError> {
        Self::verify_with(token, &self.access_secret)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, JwtError> {
        Self::verify_with(token, &self.refresh_secret)
    }

    fn verify_with(token: &str, secret: &[u8]) -> Result<Claims, JwtError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }
}

pub async fn login(
    state: web::Data<AppState>,
    credentials: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    if !state.auth.check_password(&credentials.password)? {
        warn!("Rejected admin login attempt");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    info!("Admin logged in");
    Ok(HttpResponse::Ok().json(state.auth.generate_tokens()?))
}

pub async fn refresh_token(
    state: web::Data<AppState>,
    req: web::Json<RefreshTokenRequest>,
) -> Result<HttpResponse, ApiError> {
    if let Err(e) = state.auth.verify_refresh(&req.refresh_token) {
        debug!("Refresh token verification error: {}", e);
        return Err(ApiError::Unauthorized("Invalid refresh token".into()));
    }

    Ok(HttpResponse::Ok().json(state.auth.generate_tokens()?))
}

/// Proof that the request carried a valid admin access token.
#[derive(Debug)]
pub struct AdminSession {
    pub claims: Claims,
}

fn authorize(req: &HttpRequest) -> Result<AdminSession, ApiError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| ApiError::Internal("Application state missing".into()))?;

    let auth_header = req
        .headers()
        .get("Authorization")
        .ok_or_else(|| ApiError::Unauthorized("No authorization header".into()))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Invalid authorization header".into()))?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Invalid authorization header format".into()))?;

    match state.auth.verify_access(token) {
        Ok(claims) => Ok(AdminSession { claims }),
        Err(e) => {
            debug!("Access token rejected: {}", e);
            Err(ApiError::Unauthorized("Invalid token".into()))
        }
    }
}

impl FromRequest for AdminSession {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authorize(req))
    }
}
