//! Records stored in the document database.
//!
//! Every record carries its own string `id` (UUID v4). MongoDB adds an `_id`
//! of its own, which is ignored on deserialization.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Collection names
pub mod collections {
    pub const USERS: &str = "users";
    pub const CHATS: &str = "chats";
    pub const APPOINTMENTS: &str = "appointments";
    pub const MEDICATIONS: &str = "medications";
    pub const ASSESSMENTS: &str = "assessments";

    pub const ALL: [&str; 5] = [USERS, CHATS, APPOINTMENTS, MEDICATIONS, ASSESSMENTS];
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    /// Stored lower-cased
    pub email: String,
    /// Argon2 PHC string
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        Self {
            id: new_id(),
            username,
            email: email.to_lowercase(),
            password_hash,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRecord {
    pub id: String,
    pub user_id: String,
    pub message: String,
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatRecord {
    pub fn new(user_id: String, message: String, response: String) -> Self {
        Self {
            id: new_id(),
            user_id,
            message,
            response,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Rescheduled,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Rescheduled => "rescheduled",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub user_id: String,
    pub doctor_name: String,
    pub specialization: String,
    /// YYYY-MM-DD
    pub appointment_date: String,
    /// HH:MM
    pub appointment_time: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    /// A new pending appointment
    pub fn new(
        user_id: String,
        doctor_name: String,
        specialization: String,
        appointment_date: String,
        appointment_time: String,
        notes: Option<String>,
    ) -> Self {
        Self {
            id: new_id(),
            user_id,
            doctor_name,
            specialization,
            appointment_date,
            appointment_time,
            notes,
            status: AppointmentStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

/// Changes an owner may apply to an existing appointment
#[derive(Debug, Clone)]
pub enum AppointmentUpdate {
    Reschedule { date: String, time: String },
    Cancel,
}

impl AppointmentUpdate {
    /// Apply this update to an appointment in place
    pub fn apply(&self, appointment: &mut Appointment) {
        match self {
            AppointmentUpdate::Reschedule { date, time } => {
                appointment.appointment_date = date.clone();
                appointment.appointment_time = time.clone();
                appointment.status = AppointmentStatus::Rescheduled;
            }
            AppointmentUpdate::Cancel => {
                appointment.status = AppointmentStatus::Cancelled;
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub id: String,
    pub user_id: String,
    pub medication_name: String,
    /// HH:MM, local time of the server
    pub time: String,
    pub dosage: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Date of the last reminder sent, to send at most one per day
    #[serde(default)]
    pub last_reminded_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Medication {
    pub fn new(
        user_id: String,
        medication_name: String,
        time: String,
        dosage: String,
        phone_number: Option<String>,
        notes: Option<String>,
    ) -> Self {
        Self {
            id: new_id(),
            user_id,
            medication_name,
            time,
            dosage,
            phone_number,
            notes,
            last_reminded_on: None,
            created_at: Utc::now(),
        }
    }

    /// Whether a reminder should go out at `time` on `today`
    pub fn is_due(&self, time: &str, today: NaiveDate) -> bool {
        self.time == time
            && self.phone_number.as_deref().is_some_and(|p| !p.is_empty())
            && self.last_reminded_on != Some(today)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    pub id: String,
    pub user_id: String,
    pub answers: serde_json::Value,
    pub health_score: u8,
    pub feedback: String,
    pub tips: Vec<String>,
    pub date: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn medication(time: &str, phone: Option<&str>) -> Medication {
        Medication {
            id: new_id(),
            user_id: "u1".to_string(),
            medication_name: "Metformin".to_string(),
            time: time.to_string(),
            dosage: "500mg".to_string(),
            phone_number: phone.map(String::from),
            notes: None,
            last_reminded_on: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_medication_due_requires_phone_and_time() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert!(medication("08:00", Some("+15551234567")).is_due("08:00", today));
        assert!(!medication("08:00", None).is_due("08:00", today));
        assert!(!medication("08:00", Some("")).is_due("08:00", today));
        assert!(!medication("09:00", Some("+15551234567")).is_due("08:00", today));
    }

    #[test]
    fn test_medication_not_due_twice_same_day() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let mut med = medication("08:00", Some("+15551234567"));
        med.last_reminded_on = Some(today);
        assert!(!med.is_due("08:00", today));
        assert!(med.is_due("08:00", today.succ_opt().unwrap()));
    }

    #[test]
    fn test_user_email_lowercased() {
        let user = User::new("alice".into(), "Alice@Example.COM".into(), "hash".into());
        assert_eq!(user.email, "alice@example.com");
    }

    #[test]
    fn test_appointment_status_serializes_lowercase() {
        let json = serde_json::to_string(&AppointmentStatus::Rescheduled).unwrap();
        assert_eq!(json, "\"rescheduled\"");
    }
}
