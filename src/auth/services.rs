use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::{
    auth::{
        dto::{LoginRequest, RegisterRequest},
        jwt::JwtKeys,
        password::{hash_password_blocking, verify_password_blocking},
        repo::UserRepo,
        repo_types::User,
    },
    error::AppError,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex compiles");
    }
    EMAIL_RE.is_match(email)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Validates the request, hashes the password and persists the user.
pub async fn register(users: &dyn UserRepo, req: RegisterRequest) -> Result<User, AppError> {
    let username = non_blank(req.username);
    let email = non_blank(req.email).map(|e| e.to_lowercase());
    // passwords are taken as-is, whitespace included
    let password = req.password.filter(|p| !p.is_empty());

    let (Some(username), Some(email), Some(password)) = (username, email, password) else {
        return Err(AppError::Validation(
            "username, email and password are required".into(),
        ));
    };

    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }

    if users.find_by_email(&email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(AppError::Validation(
            "User already exists with this email".into(),
        ));
    }

    let hash = hash_password_blocking(password)
        .await
        .map_err(|e| AppError::internal("Failed to register user", e))?;

    let user = users.create(&username, &email, &hash).await?;
    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

/// Looks the user up by email (preferred) or username and issues a token on a match.
pub async fn login(
    users: &dyn UserRepo,
    keys: &JwtKeys,
    req: LoginRequest,
) -> Result<String, AppError> {
    let Some(password) = req.password.filter(|p| !p.is_empty()) else {
        return Err(AppError::Validation("password is required".into()));
    };

    let user = match (non_blank(req.email), non_blank(req.username)) {
        (Some(email), _) => users.find_by_email(&email.to_lowercase()).await?,
        (None, Some(username)) => users.find_by_username(&username).await?,
        (None, None) => {
            return Err(AppError::Validation(
                "username or email is required".into(),
            ))
        }
    };

    let Some(user) = user else {
        warn!("login unknown user");
        return Err(AppError::Validation("User not found".into()));
    };

    let ok = verify_password_blocking(password, user.password_hash.clone())
        .await
        .map_err(|e| AppError::internal("Server error", e))?;

    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Validation("Incorrect password".into()));
    }

    let token = keys
        .sign(user.id)
        .map_err(|e| AppError::internal("Server error", e))?;

    info!(user_id = %user.id, "user logged in");
    Ok(token)
}
