use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::info;
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::AppState;
use crate::error::AppError;
use crate::models::User;

const MIN_PASSWORD_LEN: usize = 6;

/// Session-token signing material and cookie parameters.
pub struct AuthConfig {
    pub cookie_name: String,
    pub ttl_secs: i64,
    pub secure_cookies: bool,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

impl AuthConfig {
    pub fn new(secret: &str, cookie_name: String, ttl_secs: i64, secure_cookies: bool) -> Self {
        Self {
            cookie_name,
            ttl_secs,
            secure_cookies,
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue_token(&self, username: &str) -> Result<String, AppError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: username.to_string(),
            iat: now,
            exp: now + self.ttl_secs,
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("failed to sign session token: {}", e)))
    }

    /// Any decode failure (expired, forged, malformed) is an auth failure.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthorized("Authentication required.".into()))
    }

    fn session_cookie(&self, value: String, max_age_secs: i64) -> Cookie<'static> {
        let mut cookie = Cookie::new(self.cookie_name.clone(), value);
        cookie.set_http_only(true);
        cookie.set_same_site(SameSite::Strict);
        cookie.set_path("/");
        cookie.set_secure(self.secure_cookies);
        cookie.set_max_age(time::Duration::seconds(max_age_secs));
        cookie
    }
}

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<CredentialsRequest>,
) -> Result<(CookieJar, Json<serde_json::Value>), AppError> {
    let invalid = || AppError::Unauthorized("Invalid username or password.".into());

    let user = state
        .store
        .find_user(&body.username)
        .await?
        .ok_or_else(invalid)?;
    if !bcrypt::verify(&body.password, &user.password_hash)? {
        return Err(invalid());
    }

    let token = state.auth.issue_token(&user.username)?;
    let cookie = state.auth.session_cookie(token, state.auth.ttl_secs);
    info!("User '{}' logged in", user.username);

    Ok((
        jar.add(cookie),
        Json(json!({ "message": "Authentication successful" })),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<serde_json::Value>) {
    let mut cookie = Cookie::new(state.auth.cookie_name.clone(), "");
    cookie.set_path("/");
    (
        jar.remove(cookie),
        Json(json!({ "message": "Logout successful" })),
    )
}

/// Account creation is a one-time affair: rejected with a conflict once any
/// user record exists. The password is hashed unconditionally.
pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let username = body.username.trim();
    if username.is_empty() || body.password.is_empty() {
        return Err(AppError::InvalidInput(
            "Username and password are required.".into(),
        ));
    }
    if body.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidInput(format!(
            "Password must be at least {} characters.",
            MIN_PASSWORD_LEN
        )));
    }

    if state.store.count_users().await? > 0 {
        return Err(AppError::Conflict(
            "An account already exists. Signup is disabled.".into(),
        ));
    }

    let user = User {
        id: None,
        username: username.to_string(),
        password_hash: bcrypt::hash(&body.password, bcrypt::DEFAULT_COST)?,
        created_at: DateTime::now(),
    };
    state.store.insert_user(&user).await?;
    info!("Created account '{}'", user.username);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": "User created successfully." })),
    ))
}

/// Gate for every protected route: a valid session cookie or 401.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = jar
        .get(&state.auth.cookie_name)
        .map(|c| c.value().to_string())
        .ok_or_else(|| AppError::Unauthorized("Authentication required.".into()))?;
    state.auth.verify_token(&token)?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig::new("a-test-secret-that-is-long-enough", "auth_token".into(), 3600, false)
    }

    #[test]
    fn token_round_trips() {
        let cfg = config();
        let token = cfg.issue_token("omondi").unwrap();
        let claims = cfg.verify_token(&token).unwrap();
        assert_eq!(claims.sub, "omondi");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn expired_token_is_rejected() {
        // Expiry far enough in the past to clear default validation leeway.
        let cfg = AuthConfig::new("secret", "auth_token".into(), -300, false);
        let token = cfg.issue_token("omondi").unwrap();
        assert!(matches!(
            cfg.verify_token(&token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = config().issue_token("omondi").unwrap();
        let other = AuthConfig::new("different-secret", "auth_token".into(), 3600, false);
        assert!(other.verify_token(&token).is_err());
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(config().verify_token("not-a-jwt").is_err());
    }

    #[test]
    fn session_cookie_is_locked_down() {
        let cfg = config();
        let cookie = cfg.session_cookie("tok".into(), 3600);
        assert_eq!(cookie.name(), "auth_token");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(3600)));
    }
}
