//! Shared application state for request handlers.

use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use tera::Tera;

use crate::chatbot::ChatbotService;
use crate::config::AppConfig;
use crate::db::DbHandle;
use crate::error::AppError;
use crate::services::{MedicineClient, PlacesClient};
use crate::session::derive_cookie_key;

/// Shared application state, cloneable across handlers via Arc-wrapped fields.
///
/// This is the single context object handed to every route. The database
/// handle is `None` when the startup connection failed.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub tera: Arc<Tera>,
    pub db: Option<DbHandle>,
    pub chatbot: Arc<ChatbotService>,
    pub places: Arc<PlacesClient>,
    pub medicine: Arc<MedicineClient>,
    pub cookie_key: Key,
}

impl AppState {
    /// Build the state and its service clients from configuration.
    ///
    /// Starts no background tasks.
    pub fn new(config: AppConfig, tera: Tera, db: Option<DbHandle>) -> Result<Self, AppError> {
        let chatbot = ChatbotService::from_config(&config.chatbot)?;
        let places = PlacesClient::new(&config.places)?;
        let medicine = MedicineClient::new(&config.medicine)?;
        let cookie_key = derive_cookie_key(config.secret_key());

        Ok(Self {
            config: Arc::new(config),
            tera: Arc::new(tera),
            db,
            chatbot: Arc::new(chatbot),
            places: Arc::new(places),
            medicine: Arc::new(medicine),
            cookie_key,
        })
    }

    /// The database handle, or `AppError::DatabaseUnavailable`
    pub fn db(&self) -> Result<&DbHandle, AppError> {
        self.db.as_ref().ok_or(AppError::DatabaseUnavailable)
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}
