//! Document database access.
//!
//! Handlers never talk to a driver directly: they go through the [`Database`]
//! trait, implemented by [`MongoDatabase`] for production and
//! [`MemoryDatabase`] for development and tests. The application state holds
//! an `Option<Arc<dyn Database>>`; `None` means the startup connection failed
//! and every database-backed route answers 503.

pub mod memory;
pub mod models;
pub mod mongo;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::config::{DatabaseBackend, DatabaseConfig};

pub use memory::MemoryDatabase;
pub use models::{
    Appointment, AppointmentStatus, AppointmentUpdate, Assessment, ChatRecord, Medication, User,
};
pub use mongo::MongoDatabase;

/// Shared database handle
pub type DbHandle = Arc<dyn Database>;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("Duplicate {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Other(String),
}

impl DbError {
    /// The underlying driver or backend message, without our prefix
    pub fn message(&self) -> String {
        match self {
            DbError::Mongo(e) => e.to_string(),
            DbError::Duplicate(_) => self.to_string(),
            DbError::Other(message) => message.clone(),
        }
    }
}

/// Outcome of a liveness check against the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbHealth {
    /// Handle present and the collection listing succeeded
    Connected,
    /// No database handle
    NotConnected,
    /// Handle present but the collection listing failed
    QueryFailed(String),
}

impl DbHealth {
    /// Run a single collection listing against the handle, if any.
    pub async fn check(db: Option<&DbHandle>) -> Self {
        match db {
            None => DbHealth::NotConnected,
            Some(db) => match db.list_collection_names().await {
                Ok(_) => DbHealth::Connected,
                Err(e) => DbHealth::QueryFailed(e.message()),
            },
        }
    }
}

#[async_trait]
pub trait Database: Send + Sync {
    /// Lightweight round trip used by the liveness probe
    async fn list_collection_names(&self) -> Result<Vec<String>, DbError>;

    /// Insert a user; `DbError::Duplicate` when username or email is taken
    async fn insert_user(&self, user: &User) -> Result<(), DbError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DbError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DbError>;

    async fn insert_chat(&self, chat: &ChatRecord) -> Result<(), DbError>;
    /// Most recent chats first
    async fn recent_chats(&self, user_id: &str, limit: usize) -> Result<Vec<ChatRecord>, DbError>;

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<(), DbError>;
    /// Newest first
    async fn list_appointments(&self, user_id: &str) -> Result<Vec<Appointment>, DbError>;
    async fn find_appointment(
        &self,
        user_id: &str,
        id: &str,
    ) -> Result<Option<Appointment>, DbError>;
    /// Returns `false` when no appointment with this id belongs to the user
    async fn update_appointment(
        &self,
        user_id: &str,
        id: &str,
        update: &AppointmentUpdate,
    ) -> Result<bool, DbError>;

    async fn insert_medication(&self, medication: &Medication) -> Result<(), DbError>;
    /// Ordered by reminder time
    async fn list_medications(&self, user_id: &str) -> Result<Vec<Medication>, DbError>;
    /// Returns `false` when no medication with this id belongs to the user
    async fn delete_medication(&self, user_id: &str, id: &str) -> Result<bool, DbError>;
    /// Medications scheduled at `time` with a phone number, not yet reminded on `today`
    async fn medications_due(
        &self,
        time: &str,
        today: NaiveDate,
    ) -> Result<Vec<Medication>, DbError>;
    /// Claim today's reminder for a medication; `false` when it was already claimed
    async fn mark_medication_reminded(&self, id: &str, today: NaiveDate)
        -> Result<bool, DbError>;

    async fn insert_assessment(&self, assessment: &Assessment) -> Result<(), DbError>;
    /// Newest first
    async fn list_assessments(&self, user_id: &str) -> Result<Vec<Assessment>, DbError>;
}

/// Open the configured database.
///
/// A MongoDB connection that cannot be established yields `None` after
/// logging the failure; the server still starts and `/ping` reports it.
pub async fn connect(config: &DatabaseConfig) -> Option<DbHandle> {
    match config.backend {
        DatabaseBackend::Memory => {
            tracing::warn!("Using in-memory database; data is lost on restart");
            Some(Arc::new(MemoryDatabase::new()))
        }
        DatabaseBackend::Mongodb => match MongoDatabase::connect(config).await {
            Ok(db) => {
                tracing::info!(database = %config.name, "Connected to MongoDB");
                Some(Arc::new(db))
            }
            Err(e) => {
                tracing::error!(error = %e, "MongoDB connection failed; continuing without database");
                None
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_without_handle() {
        assert_eq!(DbHealth::check(None).await, DbHealth::NotConnected);
    }

    #[tokio::test]
    async fn test_health_with_memory_handle() {
        let db: DbHandle = Arc::new(MemoryDatabase::new());
        assert_eq!(DbHealth::check(Some(&db)).await, DbHealth::Connected);
    }

    #[test]
    fn test_error_message_drops_prefix() {
        let error = DbError::Other("connection reset by peer".into());
        assert_eq!(error.to_string(), "Database error: connection reset by peer");
        assert_eq!(error.message(), "connection reset by peer");
        assert_eq!(DbError::Duplicate("username".into()).message(), "Duplicate username");
    }

    #[tokio::test]
    async fn test_connect_memory_backend() {
        let config = DatabaseConfig {
            backend: DatabaseBackend::Memory,
            ..DatabaseConfig::default()
        };
        assert!(connect(&config).await.is_some());
    }
}
