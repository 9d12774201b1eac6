//! Request middleware.
//!
//! - `request_id_layer`: generates a UUID v4 per request and wraps the whole
//!   request in a tracing span, so every log line carries the request_id.
//! - `session_layer`: decrypts the session cookie and exposes the logged-in
//!   user to handlers as a [`CurrentUser`] extension.
//!
//! Also home to the extractors API handlers use: [`SessionUser`] as an
//! extractor rejects anonymous requests before the body is read, and
//! [`ApiJson`] reports malformed bodies in the JSON error format.

use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
    Json,
};
use axum_extra::extract::PrivateCookieJar;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::AppError;
use crate::session::{cookie_names, SessionUser};
use crate::state::AppState;

/// Extension type for accessing request ID in handlers if needed.
#[derive(Clone, Debug)]
pub struct RequestId(pub Uuid);

/// The user attached to the current request, if any
#[derive(Clone, Debug, Default)]
pub struct CurrentUser(pub Option<SessionUser>);

impl CurrentUser {
    /// The session user, or `AppError::Unauthenticated`
    pub fn require(&self) -> Result<&SessionUser, AppError> {
        self.0.as_ref().ok_or(AppError::Unauthenticated)
    }

    pub fn is_logged_in(&self) -> bool {
        self.0.is_some()
    }
}

/// Requires a logged-in user; anonymous requests get a 401 JSON error
impl<S: Send + Sync> FromRequestParts<S> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .ok_or(AppError::Unauthenticated)?
            .require()
            .cloned()
    }
}

/// JSON body whose rejections are `AppError::Validation`
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(request, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(AppError::Validation(rejection.body_text())),
        }
    }
}

/// Middleware that generates a request ID and creates a request span.
///
/// This should be the outermost middleware layer so the span wraps
/// all request processing, including other middleware and handlers.
pub async fn request_id_layer(mut request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4();

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
        user_id = tracing::field::Empty,
        duration_ms = tracing::field::Empty,
    );

    let start = Instant::now();
    request.extensions_mut().insert(RequestId(request_id));

    async move {
        let response = next.run(request).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        tracing::Span::current().record("duration_ms", duration_ms);
        tracing::info!(
            status = response.status().as_u16(),
            duration_ms,
            "Request completed"
        );

        response
    }
    .instrument(span)
    .await
}

/// Middleware that reads the encrypted session cookie.
///
/// Expired, tampered or missing cookies all yield an anonymous `CurrentUser`.
pub async fn session_layer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let jar = PrivateCookieJar::from_headers(request.headers(), state.cookie_key.clone());
    let user = jar
        .get(cookie_names::SESSION)
        .and_then(|cookie| SessionUser::from_cookie_value(cookie.value()));

    if let Some(user) = &user {
        tracing::Span::current().record("user_id", user.user_id.as_str());
    }

    request.extensions_mut().insert(CurrentUser(user));
    next.run(request).await
}
