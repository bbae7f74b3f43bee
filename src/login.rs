use crate::app::{AppState, api_error};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    Extension, Json,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use log::error;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Registration form data
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterPayload {
    /// Username for the new account
    #[serde(default)]
    pub username: String,

    /// Email address for the new account
    #[serde(default)]
    pub email: String,

    /// Password in plaintext (only transmitted, never stored)
    #[serde(default)]
    pub password: String,
}

/// Login form data
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginPayload {
    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,
}

/// Logout form data; the token travels in the body, mirroring the login
/// response that handed it out
#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutPayload {
    #[serde(default)]
    pub session_token: String,
}

/// Identity of the authenticated caller, injected by [`require_auth`]
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub i64);

/// Hash a password using Argon2
///
/// # Errors
/// * Returns an error if the password hashing fails
pub(crate) fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    match argon2.hash_password(password.as_bytes(), &salt) {
        Ok(hash) => Ok(hash.to_string()),
        Err(_) => Err("Password hashing failed".to_string()),
    }
}

/// Verify a password against a stored Argon2 hash
///
/// # Returns
/// * `Result<bool, String>` - True if the password matches, false if not
///
/// # Errors
/// * Returns an error if the hash is in an invalid format
pub(crate) fn verify_password(password: &str, hash: &str) -> Result<bool, String> {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(hash) => hash,
        Err(_) => return Err("Invalid password hash format".to_string()),
    };

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(_) => Ok(false), // Password didn't match
    }
}

/// Handle user registration
///
/// Creates a new user account. Fails with 400 when a field is missing or
/// the username/email is already registered.
pub async fn handle_register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterPayload>,
) -> Response {
    let username = payload.username.trim();
    let email = payload.email.trim();
    let password = payload.password.trim();

    if username.is_empty() || email.is_empty() || password.is_empty() {
        return api_error(
            StatusCode::BAD_REQUEST,
            "Username, email, and password are required",
        );
    }

    let password_hash = match hash_password(password) {
        Ok(hash) => hash,
        Err(e) => {
            error!("Error in /register endpoint: {e}");
            return api_error(StatusCode::INTERNAL_SERVER_ERROR, &e);
        }
    };

    match state.store.insert_user(username, email, &password_hash) {
        Ok(user_id) => Json(json!({
            "message": "User registered successfully",
            "user_id": user_id,
        }))
        .into_response(),
        Err(e) => api_error(StatusCode::BAD_REQUEST, &e),
    }
}

/// Handle user login
///
/// Validates credentials and issues a session token on success.
pub async fn handle_login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginPayload>,
) -> Response {
    let username = payload.username.trim();
    let password = payload.password.trim();

    if username.is_empty() || password.is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "Username and password are required");
    }

    let user = match state.store.find_user(username) {
        Some(user) => user,
        None => return api_error(StatusCode::UNAUTHORIZED, "Invalid credentials"),
    };

    match verify_password(password, &user.password_hash) {
        Ok(true) => {
            let session_token = state.sessions.create(user.id);
            Json(json!({
                "message": "Login successful",
                "session_token": session_token,
                "user": {
                    "id": user.id,
                    "username": user.username,
                    "email": user.email,
                },
            }))
            .into_response()
        }
        Ok(false) => api_error(StatusCode::UNAUTHORIZED, "Invalid credentials"),
        Err(e) => {
            error!("Error in /login endpoint: {e}");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Authentication error")
        }
    }
}

/// Handle user logout
///
/// Revokes the session; revoking an unknown token still succeeds.
pub async fn handle_logout(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LogoutPayload>,
) -> Response {
    let token = payload.session_token.trim();
    if token.is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "Session token is required");
    }

    state.sessions.revoke(token);
    Json(json!({"message": "Logout successful"})).into_response()
}

/// Return the identity behind the caller's session token
pub async fn current_user(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Response {
    match state.store.user_by_id(user_id) {
        Some(user) => Json(json!({
            "id": user.id,
            "username": user.username,
            "email": user.email,
            "created_at": user.created_at,
        }))
        .into_response(),
        None => api_error(StatusCode::NOT_FOUND, "User not found"),
    }
}

/// Authentication middleware for the protected routes
///
/// Reads the bearer session token from the `Authorization` header, resolves
/// it through the session store, and injects the caller's identity into the
/// request extensions. Rejects with 401 otherwise.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim_start_matches("Bearer ").trim().to_string())
        .unwrap_or_default();

    if token.is_empty() {
        return api_error(StatusCode::UNAUTHORIZED, "Session token is required");
    }

    match state.sessions.validate(&token) {
        Some(user_id) => {
            request.extensions_mut().insert(AuthUser(user_id));
            next.run(request).await
        }
        None => api_error(StatusCode::UNAUTHORIZED, "Invalid or expired session"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies_round_trip() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hash).unwrap());
        assert!(!verify_password("hunter3", &hash).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_hash_is_an_error_not_a_mismatch() {
        assert!(verify_password("pw", "not-a-phc-string").is_err());
    }
}
