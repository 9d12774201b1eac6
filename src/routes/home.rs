//! Landing page.

use axum::{extract::State, response::Html, Extension};
use tracing::instrument;

use super::insert_user_context;
use crate::error::{AppError, PageError};
use crate::middleware::CurrentUser;
use crate::state::AppState;

/// Render the landing page. Never touches the database.
#[instrument(name = "home::index", skip(state, current_user))]
pub async fn index(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Html<String>, PageError> {
    let mut context = tera::Context::new();
    insert_user_context(&mut context, &current_user);

    let html = state
        .tera
        .render("index.html", &context)
        .map_err(AppError::from)?;
    Ok(Html(html))
}
