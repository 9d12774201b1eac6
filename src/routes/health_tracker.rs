//! Health tracker: medication schedule and lifestyle self-assessment.
//!
//! Medications carrying a phone number are picked up by the reminder
//! service at their scheduled time.

use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::instrument;

use super::{insert_user_context, normalize_time, required, Blueprint};
use crate::db::models::new_id;
use crate::db::{Assessment, Medication};
use crate::error::{AppError, PageError};
use crate::middleware::{ApiJson, CurrentUser};
use crate::session::SessionUser;
use crate::services::AssessmentAnswers;
use crate::state::AppState;

const PHONE_MIN_DIGITS: usize = 8;
const PHONE_MAX_DIGITS: usize = 15;

pub fn blueprint() -> Blueprint {
    Blueprint::new(
        "health_tracker",
        Router::new()
            .route("/health-tracker", get(page))
            .route("/health-tracker/medication/add", post(add_medication))
            .route("/health-tracker/medications", get(list_medications))
            .route("/health-tracker/medication/delete", post(delete_medication))
            .route("/health-tracker/assessment/submit", post(submit_assessment))
            .route("/health-tracker/history", get(history)),
    )
}

#[derive(Debug, Deserialize)]
pub struct AddMedication {
    #[serde(default)]
    pub medication_name: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub dosage: String,
    pub phone_number: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteMedication {
    #[serde(default)]
    pub medication_id: String,
}

/// Normalize an optional phone number to `+` and digits.
///
/// Spaces and dashes are dropped; an empty value means no reminders.
fn normalize_phone(value: Option<&str>) -> Result<Option<String>, AppError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let phone: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    if phone.is_empty() {
        return Ok(None);
    }

    let valid = phone.strip_prefix('+').is_some_and(|digits| {
        (PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS).contains(&digits.len())
            && digits.chars().all(|c| c.is_ascii_digit())
    });
    if !valid {
        return Err(AppError::Validation(
            "Phone number must include the country code, e.g. +15551234567".into(),
        ));
    }
    Ok(Some(phone))
}

#[instrument(name = "health_tracker::page", skip_all)]
pub async fn page(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Response, PageError> {
    let Some(user) = current_user.0.as_ref() else {
        return Ok(Redirect::to("/login").into_response());
    };

    let mut context = tera::Context::new();
    insert_user_context(&mut context, &current_user);

    if let Some(db) = state.db.as_ref() {
        let assessments = db
            .list_assessments(&user.user_id)
            .await
            .map_err(AppError::from)?;
        if let Some(last) = assessments.first() {
            context.insert(
                "last_assessment",
                &json!({
                    "health_score": last.health_score,
                    "feedback": last.feedback,
                    "date": last.date.to_rfc3339(),
                }),
            );
        }
    }

    let html = state
        .tera
        .render("health_tracker.html", &context)
        .map_err(AppError::from)?;
    Ok(Html(html).into_response())
}

#[instrument(name = "health_tracker::add_medication", skip(state, user))]
pub async fn add_medication(
    State(state): State<AppState>,
    user: SessionUser,
    ApiJson(request): ApiJson<AddMedication>,
) -> Result<Json<Value>, AppError> {
    let medication_name = required(&request.medication_name, "Medication name")?;
    let dosage = required(&request.dosage, "Dosage")?;
    let time = normalize_time(&request.time)?;
    let phone_number = normalize_phone(request.phone_number.as_deref())?;
    let notes = request
        .notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    let medication = Medication::new(
        user.user_id.clone(),
        medication_name,
        time,
        dosage,
        phone_number,
        notes,
    );
    state.db()?.insert_medication(&medication).await?;
    tracing::info!(
        medication_id = %medication.id,
        reminders = medication.phone_number.is_some(),
        "Medication added"
    );

    Ok(Json(json!({
        "success": true,
        "message": "Medication added successfully",
        "medication": medication,
    })))
}

#[instrument(name = "health_tracker::list_medications", skip_all)]
pub async fn list_medications(
    State(state): State<AppState>,
    user: SessionUser,
) -> Result<Json<Value>, AppError> {
    let medications = state.db()?.list_medications(&user.user_id).await?;
    Ok(Json(json!({ "success": true, "medications": medications })))
}

#[instrument(name = "health_tracker::delete_medication", skip(state, user))]
pub async fn delete_medication(
    State(state): State<AppState>,
    user: SessionUser,
    ApiJson(request): ApiJson<DeleteMedication>,
) -> Result<Json<Value>, AppError> {
    let id = required(&request.medication_id, "Medication id")?;

    if !state.db()?.delete_medication(&user.user_id, &id).await? {
        return Err(AppError::NotFound("Medication not found".into()));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Medication deleted successfully",
    })))
}

#[instrument(name = "health_tracker::submit_assessment", skip_all)]
pub async fn submit_assessment(
    State(state): State<AppState>,
    user: SessionUser,
    ApiJson(raw): ApiJson<Value>,
) -> Result<Json<Value>, AppError> {
    let answers: AssessmentAnswers = serde_json::from_value(raw.clone())
        .map_err(|e| AppError::Validation(format!("Invalid assessment answers: {e}")))?;
    let result = answers.evaluate();

    let assessment = Assessment {
        id: new_id(),
        user_id: user.user_id.clone(),
        answers: raw,
        health_score: result.health_score,
        feedback: result.feedback.clone(),
        tips: result.tips.clone(),
        date: Utc::now(),
    };
    state.db()?.insert_assessment(&assessment).await?;
    tracing::info!(health_score = result.health_score, "Assessment stored");

    Ok(Json(json!({
        "success": true,
        "health_score": result.health_score,
        "feedback": result.feedback,
        "tips": result.tips,
    })))
}

#[instrument(name = "health_tracker::history", skip_all)]
pub async fn history(
    State(state): State<AppState>,
    user: SessionUser,
) -> Result<Json<Value>, AppError> {
    let history = state.db()?.list_assessments(&user.user_id).await?;
    Ok(Json(json!({ "success": true, "history": history })))
}
