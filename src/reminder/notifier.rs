//! Reminder delivery.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::TwilioConfig;

use super::ReminderJob;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("SMS provider rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Delivers one reminder to its recipient
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn notify(&self, job: &ReminderJob) -> Result<(), NotifyError>;
}

/// Writes reminders to the log; used when no SMS provider is configured
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn notify(&self, job: &ReminderJob) -> Result<(), NotifyError> {
        tracing::info!(
            medication_id = %job.medication_id,
            user_id = %job.user_id,
            phone = %job.phone_number,
            "Medication reminder: {}",
            job.message()
        );
        Ok(())
    }
}

/// Sends reminders as SMS through the Twilio Messages API
pub struct TwilioNotifier {
    http: reqwest::Client,
    config: TwilioConfig,
}

impl TwilioNotifier {
    pub fn new(config: TwilioConfig) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http, config })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.base_url.trim_end_matches('/'),
            self.config.account_sid
        )
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    fn name(&self) -> &'static str {
        "twilio"
    }

    #[tracing::instrument(name = "reminder::twilio", skip_all, fields(medication_id = %job.medication_id))]
    async fn notify(&self, job: &ReminderJob) -> Result<(), NotifyError> {
        let body = job.message();
        let response = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[
                ("To", job.phone_number.as_str()),
                ("From", self.config.from_number.as_str()),
                ("Body", body.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        tracing::debug!("SMS reminder accepted by provider");
        Ok(())
    }
}

/// Pick the notifier for the configuration: Twilio when configured, the log otherwise
pub fn from_config(twilio: Option<&TwilioConfig>) -> Result<Arc<dyn Notifier>, NotifyError> {
    Ok(match twilio {
        Some(config) => Arc::new(TwilioNotifier::new(config.clone())?),
        None => Arc::new(LogNotifier),
    })
}
