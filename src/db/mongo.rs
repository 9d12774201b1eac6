//! MongoDB implementation of [`Database`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, IndexModel};

use super::models::collections;
use super::{
    Appointment, AppointmentStatus, AppointmentUpdate, Assessment, ChatRecord, Database, DbError,
    Medication, User,
};
use crate::config::DatabaseConfig;

/// MongoDB duplicate key error code
const DUPLICATE_KEY: i32 = 11000;

pub struct MongoDatabase {
    db: mongodb::Database,
}

impl MongoDatabase {
    /// Connect, verify the server answers a ping, and create indexes.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DbError> {
        let mut options = ClientOptions::parse(&config.uri).await?;
        options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
        options.server_selection_timeout =
            Some(Duration::from_secs(config.connect_timeout_seconds));

        let client = Client::with_options(options)?;
        let db = client.database(&config.name);
        db.run_command(doc! { "ping": 1 }).await?;

        let this = Self { db };
        this.ensure_indexes().await?;
        Ok(this)
    }

    async fn ensure_indexes(&self) -> Result<(), DbError> {
        let unique = || IndexOptions::builder().unique(true).build();

        for field in ["username", "email", "id"] {
            let mut keys = Document::new();
            keys.insert(field, 1);
            self.users()
                .create_index(IndexModel::builder().keys(keys).options(unique()).build())
                .await?;
        }

        for name in [
            collections::CHATS,
            collections::APPOINTMENTS,
            collections::MEDICATIONS,
            collections::ASSESSMENTS,
        ] {
            self.db
                .collection::<Document>(name)
                .create_index(IndexModel::builder().keys(doc! { "user_id": 1 }).build())
                .await?;
        }

        self.medications()
            .create_index(IndexModel::builder().keys(doc! { "time": 1 }).build())
            .await?;

        tracing::debug!("MongoDB indexes ensured");
        Ok(())
    }

    fn users(&self) -> Collection<User> {
        self.db.collection(collections::USERS)
    }

    fn chats(&self) -> Collection<ChatRecord> {
        self.db.collection(collections::CHATS)
    }

    fn appointments(&self) -> Collection<Appointment> {
        self.db.collection(collections::APPOINTMENTS)
    }

    fn medications(&self) -> Collection<Medication> {
        self.db.collection(collections::MEDICATIONS)
    }

    fn assessments(&self) -> Collection<Assessment> {
        self.db.collection(collections::ASSESSMENTS)
    }
}

/// Map a duplicate key write error to `DbError::Duplicate`, naming the field
fn map_insert_error(err: mongodb::error::Error) -> DbError {
    if let ErrorKind::Write(WriteFailure::WriteError(ref write_error)) = *err.kind {
        if write_error.code == DUPLICATE_KEY {
            let field = if write_error.message.contains("email") {
                "email"
            } else {
                "username"
            };
            return DbError::Duplicate(field.to_string());
        }
    }
    DbError::Mongo(err)
}

fn appointment_update_doc(update: &AppointmentUpdate) -> Document {
    match update {
        AppointmentUpdate::Reschedule { date, time } => doc! {
            "$set": {
                "appointment_date": date,
                "appointment_time": time,
                "status": AppointmentStatus::Rescheduled.as_str(),
            }
        },
        AppointmentUpdate::Cancel => doc! {
            "$set": { "status": AppointmentStatus::Cancelled.as_str() }
        },
    }
}

#[async_trait]
impl Database for MongoDatabase {
    async fn list_collection_names(&self) -> Result<Vec<String>, DbError> {
        Ok(self.db.list_collection_names().await?)
    }

    async fn insert_user(&self, user: &User) -> Result<(), DbError> {
        self.users()
            .insert_one(user)
            .await
            .map(|_| ())
            .map_err(map_insert_error)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DbError> {
        Ok(self.users().find_one(doc! { "username": username }).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        Ok(self
            .users()
            .find_one(doc! { "email": email.to_lowercase() })
            .await?)
    }

    async fn insert_chat(&self, chat: &ChatRecord) -> Result<(), DbError> {
        self.chats().insert_one(chat).await?;
        Ok(())
    }

    async fn recent_chats(&self, user_id: &str, limit: usize) -> Result<Vec<ChatRecord>, DbError> {
        let cursor = self
            .chats()
            .find(doc! { "user_id": user_id })
            .sort(doc! { "_id": -1 })
            .limit(limit as i64)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<(), DbError> {
        self.appointments().insert_one(appointment).await?;
        Ok(())
    }

    async fn list_appointments(&self, user_id: &str) -> Result<Vec<Appointment>, DbError> {
        let cursor = self
            .appointments()
            .find(doc! { "user_id": user_id })
            .sort(doc! { "_id": -1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_appointment(
        &self,
        user_id: &str,
        id: &str,
    ) -> Result<Option<Appointment>, DbError> {
        Ok(self
            .appointments()
            .find_one(doc! { "id": id, "user_id": user_id })
            .await?)
    }

    async fn update_appointment(
        &self,
        user_id: &str,
        id: &str,
        update: &AppointmentUpdate,
    ) -> Result<bool, DbError> {
        let result = self
            .appointments()
            .update_one(
                doc! { "id": id, "user_id": user_id },
                appointment_update_doc(update),
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn insert_medication(&self, medication: &Medication) -> Result<(), DbError> {
        self.medications().insert_one(medication).await?;
        Ok(())
    }

    async fn list_medications(&self, user_id: &str) -> Result<Vec<Medication>, DbError> {
        let cursor = self
            .medications()
            .find(doc! { "user_id": user_id })
            .sort(doc! { "time": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn delete_medication(&self, user_id: &str, id: &str) -> Result<bool, DbError> {
        let result = self
            .medications()
            .delete_one(doc! { "id": id, "user_id": user_id })
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn medications_due(
        &self,
        time: &str,
        today: NaiveDate,
    ) -> Result<Vec<Medication>, DbError> {
        let cursor = self
            .medications()
            .find(doc! {
                "time": time,
                "phone_number": { "$nin": [null, ""] },
                "last_reminded_on": { "$ne": today.to_string() },
            })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn mark_medication_reminded(
        &self,
        id: &str,
        today: NaiveDate,
    ) -> Result<bool, DbError> {
        let today = today.to_string();
        let result = self
            .medications()
            .update_one(
                doc! { "id": id, "last_reminded_on": { "$ne": &today } },
                doc! { "$set": { "last_reminded_on": &today } },
            )
            .await?;
        Ok(result.modified_count == 1)
    }

    async fn insert_assessment(&self, assessment: &Assessment) -> Result<(), DbError> {
        self.assessments().insert_one(assessment).await?;
        Ok(())
    }

    async fn list_assessments(&self, user_id: &str) -> Result<Vec<Assessment>, DbError> {
        let cursor = self
            .assessments()
            .find(doc! { "user_id": user_id })
            .sort(doc! { "_id": -1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }
}
