//! HTTP route handlers.
//!
//! The landing page, the liveness probe and static assets are mounted
//! directly. Everything else lives in four blueprints (auth, chatbot,
//! dashboard, health tracker), each a named route group registered once.
//!
//! Request tracing is enabled via middleware that generates a unique request ID
//! for each incoming request, allowing correlation of all logs within a request.

pub mod auth;
pub mod chatbot;
pub mod dashboard;
pub mod health;
pub mod health_tracker;
pub mod home;

use std::collections::HashSet;

use axum::{middleware, routing::get, Router};
use chrono::{NaiveDate, NaiveTime};
use http::header::{HeaderValue, CACHE_CONTROL};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::{
    CACHE_CONTROL_HOME, CACHE_CONTROL_NO_STORE, CACHE_CONTROL_STATIC, REMINDER_TIME_FORMAT,
    STATIC_DIR,
};
use crate::error::AppError;
use crate::http::cors::cors_layer;
use crate::http::static_files::create_static_service;
use crate::middleware::{request_id_layer, session_layer, CurrentUser};
use crate::state::AppState;

/// A named group of routes
pub struct Blueprint {
    pub name: &'static str,
    pub router: Router<AppState>,
}

impl Blueprint {
    pub fn new(name: &'static str, router: Router<AppState>) -> Self {
        Self { name, router }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("blueprint '{0}' is already registered")]
    DuplicateBlueprint(&'static str),
}

/// The application's blueprints, in registration order
pub fn blueprints() -> Vec<Blueprint> {
    vec![
        dashboard::blueprint(),
        auth::blueprint(),
        chatbot::blueprint(),
        health_tracker::blueprint(),
    ]
}

/// Merge blueprints into one router, rejecting a name registered twice.
pub fn register_blueprints(
    blueprints: Vec<Blueprint>,
) -> Result<Router<AppState>, RouterError> {
    let mut seen = HashSet::new();
    let mut router = Router::new();

    for blueprint in blueprints {
        if !seen.insert(blueprint.name) {
            return Err(RouterError::DuplicateBlueprint(blueprint.name));
        }
        tracing::debug!(blueprint = blueprint.name, "Registered blueprint");
        router = router.merge(blueprint.router);
    }

    Ok(router)
}

/// Insert the logged-in user (if any) for template rendering
pub fn insert_user_context(context: &mut tera::Context, current_user: &CurrentUser) {
    context.insert("is_logged_in", &current_user.is_logged_in());
    if let Some(user) = current_user.0.as_ref() {
        context.insert(
            "user",
            &serde_json::json!({
                "username": user.username,
                "email": user.email,
            }),
        );
    }
}

/// Trimmed value of a required field
fn required(value: &str, label: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{label} is required")));
    }
    Ok(value.to_string())
}

/// Parse an `HH:MM` time, returned zero-padded
fn normalize_time(value: &str) -> Result<String, AppError> {
    NaiveTime::parse_from_str(value.trim(), REMINDER_TIME_FORMAT)
        .map(|t| t.format(REMINDER_TIME_FORMAT).to_string())
        .map_err(|_| AppError::Validation("Time must be in HH:MM format".into()))
}

/// Parse a `YYYY-MM-DD` date
fn parse_date(value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation("Date must be in YYYY-MM-DD format".into()))
}

/// Creates the Axum router with all routes, cache headers and middleware.
///
/// Building the router starts no background work.
pub fn create_router(state: AppState) -> Result<Router, RouterError> {
    // Landing page - static template, short private cache
    let home_routes = Router::new().route("/", get(home::index)).layer(
        SetResponseHeaderLayer::if_not_present(
            CACHE_CONTROL,
            HeaderValue::from_static(CACHE_CONTROL_HOME),
        ),
    );

    // Liveness probe - always fresh
    let health_routes = Router::new().route("/ping", get(health::ping)).layer(
        SetResponseHeaderLayer::if_not_present(
            CACHE_CONTROL,
            HeaderValue::from_static(CACHE_CONTROL_NO_STORE),
        ),
    );

    // Static files - long cache with immutable hint
    let static_routes = Router::new()
        .nest_service("/static", create_static_service(STATIC_DIR))
        .layer(SetResponseHeaderLayer::if_not_present(
            CACHE_CONTROL,
            HeaderValue::from_static(CACHE_CONTROL_STATIC),
        ));

    // Blueprints - per-user data, never cached
    let blueprint_routes = register_blueprints(blueprints())?.layer(
        SetResponseHeaderLayer::if_not_present(
            CACHE_CONTROL,
            HeaderValue::from_static(CACHE_CONTROL_NO_STORE),
        ),
    );

    let cors = cors_layer(&state.config.cors);

    Ok(Router::new()
        .merge(home_routes)
        .merge(health_routes)
        .merge(blueprint_routes)
        .merge(static_routes)
        .with_state(state.clone())
        // Session layer - decrypts the session cookie into CurrentUser
        .layer(middleware::from_fn_with_state(state, session_layer))
        .layer(cors)
        // Request ID middleware - creates root span with request_id for correlation
        .layer(middleware::from_fn(request_id_layer)))
}
