//! Authentication routes: registration, login and logout.
//!
//! Routes:
//! - GET/POST /login - Login form; success sets the session cookie
//! - GET/POST /register - Registration form
//! - GET/POST /logout - Clear session and redirect to home

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Extension, Form, Router,
};
use axum_extra::extract::PrivateCookieJar;
use serde::Deserialize;
use tracing::instrument;

use super::{insert_user_context, Blueprint};
use crate::db::{DbError, User};
use crate::error::{AppError, PageError};
use crate::middleware::CurrentUser;
use crate::password::{hash_password, verify_password};
use crate::session::{removal_cookie, session_cookie, SessionUser};
use crate::state::AppState;

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 6;
const INVALID_CREDENTIALS: &str = "invalid_credentials";

pub fn blueprint() -> Blueprint {
    Blueprint::new(
        "auth",
        Router::new()
            .route("/login", get(login_page).post(login))
            .route("/register", get(register_page).post(register))
            .route("/logout", get(logout).post(logout)),
    )
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub error: Option<String>,
    pub registered: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "confirmPassword")]
    pub confirm_password: String,
}

fn is_valid_username(username: &str) -> bool {
    username.chars().count() >= MIN_USERNAME_LEN
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `local@domain.tld` with no whitespace
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((name, tld)) => !name.is_empty() && !tld.is_empty() && !name.ends_with('.'),
        None => false,
    }
}

/// Check a registration form; the error is shown to the user
fn validate_registration(form: &RegisterForm) -> Result<(), String> {
    let username = form.username.trim();
    if username.is_empty() {
        return Err("Username is required".into());
    }
    if !is_valid_username(username) {
        return Err(format!(
            "Username must be at least {MIN_USERNAME_LEN} characters and contain only letters, numbers and underscores"
        ));
    }
    if form.email.trim().is_empty() {
        return Err("Email is required".into());
    }
    if !is_valid_email(form.email.trim()) {
        return Err("Please enter a valid email address".into());
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        ));
    }
    if form.password != form.confirm_password {
        return Err("Passwords do not match".into());
    }
    Ok(())
}

fn render_register(
    state: &AppState,
    status: StatusCode,
    error: Option<&str>,
    form: Option<&RegisterForm>,
) -> Result<Response, PageError> {
    let mut context = tera::Context::new();
    context.insert("is_logged_in", &false);
    if let Some(error) = error {
        context.insert("error", error);
    }
    if let Some(form) = form {
        context.insert("username", form.username.trim());
        context.insert("email", form.email.trim());
    }

    let html = state
        .tera
        .render("auth/register.html", &context)
        .map_err(AppError::from)?;
    Ok((status, Html(html)).into_response())
}

#[instrument(name = "auth::login_page", skip(state, current_user))]
pub async fn login_page(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<LoginQuery>,
) -> Result<Response, PageError> {
    if current_user.is_logged_in() {
        return Ok(Redirect::to("/dashboard").into_response());
    }

    let mut context = tera::Context::new();
    insert_user_context(&mut context, &current_user);
    if query.error.as_deref() == Some(INVALID_CREDENTIALS) {
        context.insert("error", "Invalid username or password");
    }
    if query.registered.as_deref() == Some("true") {
        context.insert("success", "Registration successful! Please log in.");
    }

    let html = state
        .tera
        .render("auth/login.html", &context)
        .map_err(AppError::from)?;
    Ok(Html(html).into_response())
}

/// Find a user by username, or by email when the identifier looks like one
async fn find_login_user(state: &AppState, identifier: &str) -> Result<Option<User>, AppError> {
    let db = state.db()?;
    if let Some(user) = db.find_user_by_username(identifier).await? {
        return Ok(Some(user));
    }
    if identifier.contains('@') {
        return Ok(db.find_user_by_email(identifier).await?);
    }
    Ok(None)
}

#[instrument(name = "auth::login", skip_all)]
pub async fn login(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Form(form): Form<LoginForm>,
) -> Result<(PrivateCookieJar, Redirect), PageError> {
    let failed = Redirect::to(&format!("/login?error={INVALID_CREDENTIALS}"));

    let identifier = form.username.trim();
    if identifier.is_empty() || form.password.is_empty() {
        return Ok((jar, failed));
    }

    let Some(user) = find_login_user(&state, identifier).await? else {
        tracing::info!(identifier, "Login failed: unknown user");
        return Ok((jar, failed));
    };

    if !verify_password(&user.password_hash, &form.password) {
        tracing::info!(user_id = %user.id, "Login failed: wrong password");
        return Ok((jar, failed));
    }

    let lifetime = state.config.session.lifetime();
    let session = SessionUser::new(&user, lifetime);
    tracing::info!(user_id = %user.id, "User logged in");

    Ok((
        jar.add(session_cookie(&session, lifetime)),
        Redirect::to("/dashboard"),
    ))
}

#[instrument(name = "auth::register_page", skip(state, current_user))]
pub async fn register_page(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Response, PageError> {
    if current_user.is_logged_in() {
        return Ok(Redirect::to("/dashboard").into_response());
    }
    render_register(&state, StatusCode::OK, None, None)
}

#[instrument(name = "auth::register", skip_all)]
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, PageError> {
    if let Err(message) = validate_registration(&form) {
        return render_register(&state, StatusCode::BAD_REQUEST, Some(&message), Some(&form));
    }

    let db = state.db()?;
    let username = form.username.trim();
    let email = form.email.trim().to_lowercase();

    if db.find_user_by_username(username).await.map_err(AppError::from)?.is_some() {
        return render_register(
            &state,
            StatusCode::CONFLICT,
            Some("Username already exists"),
            Some(&form),
        );
    }
    if db.find_user_by_email(&email).await.map_err(AppError::from)?.is_some() {
        return render_register(
            &state,
            StatusCode::CONFLICT,
            Some("Email already registered"),
            Some(&form),
        );
    }

    let password_hash = hash_password(&form.password).map_err(AppError::from)?;
    let user = User::new(username.to_string(), email, password_hash);

    match db.insert_user(&user).await {
        Ok(()) => {}
        // Lost a race with a concurrent registration
        Err(DbError::Duplicate(field)) => {
            let message = if field == "email" {
                "Email already registered"
            } else {
                "Username already exists"
            };
            return render_register(&state, StatusCode::CONFLICT, Some(message), Some(&form));
        }
        Err(e) => return Err(AppError::from(e).into()),
    }

    tracing::info!(user_id = %user.id, "User registered");
    Ok(Redirect::to("/login?registered=true").into_response())
}

#[instrument(name = "auth::logout", skip_all)]
pub async fn logout(jar: PrivateCookieJar) -> (PrivateCookieJar, Redirect) {
    (jar.remove(removal_cookie()), Redirect::to("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(username: &str, email: &str, password: &str, confirm: &str) -> RegisterForm {
        RegisterForm {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            confirm_password: confirm.into(),
        }
    }

    #[test]
    fn test_valid_registration() {
        assert!(validate_registration(&form("dana_1", "dana@example.com", "secret", "secret")).is_ok());
    }

    #[test]
    fn test_username_rules() {
        assert!(is_valid_username("abc"));
        assert!(is_valid_username("a_b_9"));
        assert!(!is_valid_username("ab"));
        assert!(!is_valid_username("bad name"));
        assert!(!is_valid_username("dash-ed"));
    }

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a@.co"));
        assert!(!is_valid_email("a@b."));
        assert!(!is_valid_email("a b@c.io"));
        assert!(!is_valid_email("a@b@c.io"));
    }

    #[test]
    fn test_registration_messages() {
        let err = validate_registration(&form("dana", "dana@example.com", "12345", "12345"));
        assert!(err.unwrap_err().contains("at least 6"));

        let err = validate_registration(&form("dana", "dana@example.com", "123456", "1234567"));
        assert_eq!(err.unwrap_err(), "Passwords do not match");

        let err = validate_registration(&form("", "dana@example.com", "123456", "123456"));
        assert_eq!(err.unwrap_err(), "Username is required");
    }
}
