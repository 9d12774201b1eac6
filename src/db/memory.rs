//! In-memory database for development and tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use super::models::collections;
use super::{
    Appointment, AppointmentUpdate, Assessment, ChatRecord, Database, DbError, Medication, User,
};

#[derive(Default)]
struct Collections {
    users: Vec<User>,
    chats: Vec<ChatRecord>,
    appointments: Vec<Appointment>,
    medications: Vec<Medication>,
    assessments: Vec<Assessment>,
}

/// Vec-backed collections behind a single lock, kept in insertion order.
#[derive(Default)]
pub struct MemoryDatabase {
    inner: RwLock<Collections>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn list_collection_names(&self) -> Result<Vec<String>, DbError> {
        Ok(collections::ALL.iter().map(|c| c.to_string()).collect())
    }

    async fn insert_user(&self, user: &User) -> Result<(), DbError> {
        let mut inner = self.inner.write().await;
        if inner.users.iter().any(|u| u.username == user.username) {
            return Err(DbError::Duplicate("username".to_string()));
        }
        if inner.users.iter().any(|u| u.email == user.email) {
            return Err(DbError::Duplicate("email".to_string()));
        }
        inner.users.push(user.clone());
        Ok(())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DbError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let email = email.to_lowercase();
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn insert_chat(&self, chat: &ChatRecord) -> Result<(), DbError> {
        self.inner.write().await.chats.push(chat.clone());
        Ok(())
    }

    async fn recent_chats(&self, user_id: &str, limit: usize) -> Result<Vec<ChatRecord>, DbError> {
        let inner = self.inner.read().await;
        Ok(inner
            .chats
            .iter()
            .rev()
            .filter(|c| c.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<(), DbError> {
        self.inner.write().await.appointments.push(appointment.clone());
        Ok(())
    }

    async fn list_appointments(&self, user_id: &str) -> Result<Vec<Appointment>, DbError> {
        let inner = self.inner.read().await;
        Ok(inner
            .appointments
            .iter()
            .rev()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_appointment(
        &self,
        user_id: &str,
        id: &str,
    ) -> Result<Option<Appointment>, DbError> {
        let inner = self.inner.read().await;
        Ok(inner
            .appointments
            .iter()
            .find(|a| a.id == id && a.user_id == user_id)
            .cloned())
    }

    async fn update_appointment(
        &self,
        user_id: &str,
        id: &str,
        update: &AppointmentUpdate,
    ) -> Result<bool, DbError> {
        let mut inner = self.inner.write().await;
        match inner
            .appointments
            .iter_mut()
            .find(|a| a.id == id && a.user_id == user_id)
        {
            Some(appointment) => {
                update.apply(appointment);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_medication(&self, medication: &Medication) -> Result<(), DbError> {
        self.inner.write().await.medications.push(medication.clone());
        Ok(())
    }

    async fn list_medications(&self, user_id: &str) -> Result<Vec<Medication>, DbError> {
        let inner = self.inner.read().await;
        let mut meds: Vec<Medication> = inner
            .medications
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        meds.sort_by(|a, b| a.time.cmp(&b.time));
        Ok(meds)
    }

    async fn delete_medication(&self, user_id: &str, id: &str) -> Result<bool, DbError> {
        let mut inner = self.inner.write().await;
        let before = inner.medications.len();
        inner
            .medications
            .retain(|m| !(m.id == id && m.user_id == user_id));
        Ok(inner.medications.len() != before)
    }

    async fn medications_due(
        &self,
        time: &str,
        today: NaiveDate,
    ) -> Result<Vec<Medication>, DbError> {
        let inner = self.inner.read().await;
        Ok(inner
            .medications
            .iter()
            .filter(|m| m.is_due(time, today))
            .cloned()
            .collect())
    }

    async fn mark_medication_reminded(
        &self,
        id: &str,
        today: NaiveDate,
    ) -> Result<bool, DbError> {
        let mut inner = self.inner.write().await;
        match inner
            .medications
            .iter_mut()
            .find(|m| m.id == id && m.last_reminded_on != Some(today))
        {
            Some(med) => {
                med.last_reminded_on = Some(today);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_assessment(&self, assessment: &Assessment) -> Result<(), DbError> {
        self.inner.write().await.assessments.push(assessment.clone());
        Ok(())
    }

    async fn list_assessments(&self, user_id: &str) -> Result<Vec<Assessment>, DbError> {
        let inner = self.inner.read().await;
        Ok(inner
            .assessments
            .iter()
            .rev()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{new_id, AppointmentStatus};
    use chrono::Utc;

    fn appointment(user_id: &str) -> Appointment {
        Appointment {
            id: new_id(),
            user_id: user_id.to_string(),
            doctor_name: "Dr. Rao".to_string(),
            specialization: "Cardiology".to_string(),
            appointment_date: "2030-01-15".to_string(),
            appointment_time: "10:30".to_string(),
            notes: None,
            status: AppointmentStatus::Pending,
            created_at: Utc::now(),
        }
    }

    fn medication(user_id: &str, time: &str) -> Medication {
        Medication {
            id: new_id(),
            user_id: user_id.to_string(),
            medication_name: "Aspirin".to_string(),
            time: time.to_string(),
            dosage: "75mg".to_string(),
            phone_number: Some("+15551234567".to_string()),
            notes: None,
            last_reminded_on: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_username_and_email_rejected() {
        let db = MemoryDatabase::new();
        db.insert_user(&User::new("bob".into(), "bob@example.com".into(), "h".into()))
            .await
            .unwrap();

        let same_name = User::new("bob".into(), "other@example.com".into(), "h".into());
        assert!(matches!(
            db.insert_user(&same_name).await,
            Err(DbError::Duplicate(field)) if field == "username"
        ));

        let same_email = User::new("bobby".into(), "BOB@example.com".into(), "h".into());
        assert!(matches!(
            db.insert_user(&same_email).await,
            Err(DbError::Duplicate(field)) if field == "email"
        ));

        assert!(db.find_user_by_email("Bob@Example.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_appointment_checks_owner() {
        let db = MemoryDatabase::new();
        let appt = appointment("alice");
        db.insert_appointment(&appt).await.unwrap();

        let updated = db
            .update_appointment("mallory", &appt.id, &AppointmentUpdate::Cancel)
            .await
            .unwrap();
        assert!(!updated);

        let updated = db
            .update_appointment("alice", &appt.id, &AppointmentUpdate::Cancel)
            .await
            .unwrap();
        assert!(updated);

        let stored = db.find_appointment("alice", &appt.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_medications_sorted_and_delete_checks_owner() {
        let db = MemoryDatabase::new();
        let evening = medication("alice", "20:00");
        let morning = medication("alice", "08:00");
        db.insert_medication(&evening).await.unwrap();
        db.insert_medication(&morning).await.unwrap();

        let meds = db.list_medications("alice").await.unwrap();
        assert_eq!(meds[0].time, "08:00");
        assert_eq!(meds[1].time, "20:00");

        assert!(!db.delete_medication("mallory", &morning.id).await.unwrap());
        assert!(db.delete_medication("alice", &morning.id).await.unwrap());
        assert_eq!(db.list_medications("alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mark_reminded_removes_from_due() {
        let db = MemoryDatabase::new();
        let med = medication("alice", "08:00");
        db.insert_medication(&med).await.unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

        assert_eq!(db.medications_due("08:00", today).await.unwrap().len(), 1);
        assert!(db.mark_medication_reminded(&med.id, today).await.unwrap());
        assert!(db.medications_due("08:00", today).await.unwrap().is_empty());
        // Second claim for the same day loses
        assert!(!db.mark_medication_reminded(&med.id, today).await.unwrap());
    }

    #[tokio::test]
    async fn test_recent_chats_newest_first_with_limit() {
        let db = MemoryDatabase::new();
        for i in 0..3 {
            db.insert_chat(&ChatRecord::new("alice".into(), format!("m{}", i), "r".into()))
                .await
                .unwrap();
        }
        db.insert_chat(&ChatRecord::new("bob".into(), "other".into(), "r".into()))
            .await
            .unwrap();

        let chats = db.recent_chats("alice", 2).await.unwrap();
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[0].message, "m2");
        assert_eq!(chats[1].message, "m1");
    }
}
