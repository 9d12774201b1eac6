//! Background medication reminders.
//!
//! A scheduler task wakes every `interval_seconds`, reads the local wall-clock
//! minute, and queues a [`ReminderJob`] for every medication due at that
//! minute. Dispatcher tasks take jobs off the bounded queue and hand them to
//! the [`Notifier`]. Each medication's reminder for the day is claimed in the
//! database before its job is queued, so it is never queued twice on the same
//! day. A failed claim skips only that medication; delivery failures are
//! logged and not retried.
//!
//! The service is started by the binary entry point only, and at most once.

mod notifier;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_channel::{Receiver, Sender};
use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::config::{ReminderConfig, REMINDER_TIME_FORMAT};
use crate::db::{DbError, DbHandle, Medication};

pub use notifier::{
    from_config as notifier_from_config, LogNotifier, Notifier, NotifyError, TwilioNotifier,
};

#[derive(Debug, thiserror::Error)]
pub enum ReminderError {
    #[error("reminder service is already running")]
    AlreadyStarted,

    #[error("reminder queue is closed")]
    QueueClosed,

    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Notifier(#[from] NotifyError),
}

/// One reminder to deliver
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReminderJob {
    pub medication_id: String,
    pub user_id: String,
    pub medication_name: String,
    pub dosage: String,
    pub time: String,
    pub phone_number: String,
    pub notes: Option<String>,
}

impl ReminderJob {
    /// `None` for medications without a phone number
    fn from_medication(medication: Medication) -> Option<Self> {
        let phone_number = medication.phone_number.filter(|p| !p.is_empty())?;
        Some(Self {
            medication_id: medication.id,
            user_id: medication.user_id,
            medication_name: medication.medication_name,
            dosage: medication.dosage,
            time: medication.time,
            phone_number,
            notes: medication.notes,
        })
    }

    /// Text sent to the recipient
    pub fn message(&self) -> String {
        let mut text = format!(
            "MediBot reminder: time to take {} ({}) scheduled for {}.",
            self.medication_name, self.dosage, self.time
        );
        if let Some(notes) = self.notes.as_deref().filter(|n| !n.is_empty()) {
            text.push_str(" Note: ");
            text.push_str(notes);
        }
        text
    }
}

pub struct ReminderService {
    db: Option<DbHandle>,
    notifier: Arc<dyn Notifier>,
    interval: Duration,
    workers: usize,
    queue_capacity: usize,
    started: AtomicBool,
}

impl ReminderService {
    /// Build the service with the notifier chosen by configuration
    pub fn new(config: &ReminderConfig, db: Option<DbHandle>) -> Result<Self, ReminderError> {
        let notifier = notifier_from_config(config.twilio.as_ref())?;
        Ok(Self::with_notifier(config, db, notifier))
    }

    pub fn with_notifier(
        config: &ReminderConfig,
        db: Option<DbHandle>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            db,
            notifier,
            interval: Duration::from_secs(config.interval_seconds.max(1)),
            workers: config.workers.max(1),
            queue_capacity: config.queue_capacity.max(1),
            started: AtomicBool::new(false),
        }
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Spawn the scheduler and dispatcher tasks.
    ///
    /// Must be called from within a tokio runtime. A second call returns
    /// [`ReminderError::AlreadyStarted`] and spawns nothing.
    pub fn start(self: &Arc<Self>) -> Result<(), ReminderError> {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ReminderError::AlreadyStarted);
        }

        let (tx, rx) = async_channel::bounded(self.queue_capacity);

        for id in 0..self.workers {
            tokio::spawn(dispatch_loop(id, rx.clone(), self.notifier.clone()));
        }

        let service = Arc::clone(self);
        tokio::spawn(async move { service.run_scheduler(tx).await });

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            workers = self.workers,
            notifier = self.notifier.name(),
            "Reminder service started"
        );
        Ok(())
    }

    async fn run_scheduler(&self, queue: Sender<ReminderJob>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let now = Local::now();
            let time = now.format(REMINDER_TIME_FORMAT).to_string();

            match self.tick(&time, now.date_naive(), &queue).await {
                Ok(0) => {}
                Ok(queued) => tracing::info!(time = %time, queued, "Reminders queued"),
                Err(ReminderError::QueueClosed) => {
                    tracing::error!("Reminder queue closed, scheduler stopping");
                    return;
                }
                Err(e) => tracing::warn!(error = %e, "Reminder check failed"),
            }
        }
    }

    /// Queue every medication due at `time` on `today`; returns how many were queued.
    #[tracing::instrument(name = "reminder::tick", skip(self, queue))]
    pub async fn tick(
        &self,
        time: &str,
        today: NaiveDate,
        queue: &Sender<ReminderJob>,
    ) -> Result<usize, ReminderError> {
        let Some(db) = &self.db else {
            tracing::warn!("No database connection, skipping reminder check");
            return Ok(0);
        };

        let mut queued = 0;
        for medication in db.medications_due(time, today).await? {
            let Some(job) = ReminderJob::from_medication(medication) else {
                continue;
            };

            match db.mark_medication_reminded(&job.medication_id, today).await {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    tracing::warn!(
                        medication_id = %job.medication_id,
                        error = %e,
                        "Could not claim reminder, skipping"
                    );
                    continue;
                }
            }

            queue
                .send(job)
                .await
                .map_err(|_| ReminderError::QueueClosed)?;
            queued += 1;
        }

        Ok(queued)
    }
}

/// Deliver queued jobs until the queue is closed and drained
async fn dispatch_loop(id: usize, queue: Receiver<ReminderJob>, notifier: Arc<dyn Notifier>) {
    tracing::debug!(worker = id, "Reminder dispatcher started");

    while let Ok(job) = queue.recv().await {
        match notifier.notify(&job).await {
            Ok(()) => tracing::debug!(
                worker = id,
                medication_id = %job.medication_id,
                "Reminder delivered"
            ),
            Err(e) => tracing::warn!(
                worker = id,
                medication_id = %job.medication_id,
                error = %e,
                "Reminder delivery failed"
            ),
        }
    }

    tracing::debug!(worker = id, "Reminder dispatcher stopped");
}
