//! Dashboard: hospital finder, medicine lookup, appointments and chat history.
//!
//! Every route requires a session. The page redirects anonymous visitors to
//! the login form; the JSON endpoints answer 401.

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::instrument;

use super::{insert_user_context, normalize_time, parse_date, required, Blueprint};
use crate::db::{Appointment, AppointmentStatus, AppointmentUpdate};
use crate::error::{AppError, PageError};
use crate::middleware::{ApiJson, CurrentUser};
use crate::session::SessionUser;
use crate::services::{MedicineInfo, NearbyRequest};
use crate::state::AppState;

pub fn blueprint() -> Blueprint {
    Blueprint::new(
        "dashboard",
        Router::new()
            .route("/dashboard", get(page))
            .route("/dashboard/hospitals/nearby", post(nearby_hospitals))
            .route("/dashboard/medicine/search", post(search_medicine))
            .route("/dashboard/appointments", get(list_appointments))
            .route("/dashboard/appointment/book", post(book_appointment))
            .route("/dashboard/appointment/reschedule", post(reschedule_appointment))
            .route("/dashboard/appointment/cancel", post(cancel_appointment))
            .route("/dashboard/chat/history", get(chat_history)),
    )
}

#[derive(Debug, Deserialize)]
pub struct MedicineSearch {
    #[serde(default)]
    pub medicine_name: String,
}

#[derive(Debug, Deserialize)]
pub struct BookAppointment {
    #[serde(default)]
    pub doctor_name: String,
    #[serde(default)]
    pub specialization: String,
    #[serde(default)]
    pub appointment_date: String,
    #[serde(default)]
    pub appointment_time: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RescheduleAppointment {
    #[serde(default)]
    pub appointment_id: String,
    #[serde(default)]
    pub new_date: String,
    #[serde(default)]
    pub new_time: String,
}

#[derive(Debug, Deserialize)]
pub struct CancelAppointment {
    #[serde(default)]
    pub appointment_id: String,
}

#[derive(Serialize)]
struct MedicineFound<'a> {
    found: bool,
    #[serde(flatten)]
    info: &'a MedicineInfo,
}

/// A date that is today or later
fn future_date(value: &str) -> Result<String, AppError> {
    let date = parse_date(value)?;
    if date < Local::now().date_naive() {
        return Err(AppError::Validation(
            "Appointment date cannot be in the past".into(),
        ));
    }
    Ok(date.format("%Y-%m-%d").to_string())
}

#[instrument(name = "dashboard::page", skip(state, current_user))]
pub async fn page(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Response, PageError> {
    if !current_user.is_logged_in() {
        return Ok(Redirect::to("/login").into_response());
    }

    let mut context = tera::Context::new();
    insert_user_context(&mut context, &current_user);
    context.insert("places_enabled", &state.places.is_configured());

    let html = state
        .tera
        .render("dashboard.html", &context)
        .map_err(AppError::from)?;
    Ok(Html(html).into_response())
}

#[instrument(name = "dashboard::nearby_hospitals", skip(state, _user))]
pub async fn nearby_hospitals(
    State(state): State<AppState>,
    _user: SessionUser,
    ApiJson(request): ApiJson<NearbyRequest>,
) -> Result<Json<Value>, AppError> {
    if !state.places.is_configured() {
        return Err(AppError::FeatureUnavailable("Hospital search"));
    }
    if !(-90.0..=90.0).contains(&request.latitude)
        || !(-180.0..=180.0).contains(&request.longitude)
    {
        return Err(AppError::Validation("Invalid coordinates".into()));
    }

    let result = state.places.nearby(&request).await?;
    Ok(Json(json!({
        "success": true,
        "hospitals": result.hospitals,
        "next_page_token": result.next_page_token,
    })))
}

#[instrument(name = "dashboard::search_medicine", skip(state, _user))]
pub async fn search_medicine(
    State(state): State<AppState>,
    _user: SessionUser,
    ApiJson(request): ApiJson<MedicineSearch>,
) -> Result<Response, AppError> {
    let name = required(&request.medicine_name, "Medicine name")?;

    match state.medicine.lookup(&name).await? {
        Some(info) => Ok(Json(MedicineFound {
            found: true,
            info: &info,
        })
        .into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({
                "found": false,
                "message": format!(
                    "No information found for \"{name}\". Please check the spelling and try again."
                ),
            })),
        )
            .into_response()),
    }
}

#[instrument(name = "dashboard::list_appointments", skip_all)]
pub async fn list_appointments(
    State(state): State<AppState>,
    user: SessionUser,
) -> Result<Json<Value>, AppError> {
    let appointments = state.db()?.list_appointments(&user.user_id).await?;
    Ok(Json(json!({ "success": true, "appointments": appointments })))
}

#[instrument(name = "dashboard::book_appointment", skip(state, user))]
pub async fn book_appointment(
    State(state): State<AppState>,
    user: SessionUser,
    ApiJson(request): ApiJson<BookAppointment>,
) -> Result<Json<Value>, AppError> {
    let doctor_name = required(&request.doctor_name, "Doctor name")?;
    let specialization = required(&request.specialization, "Specialization")?;
    let appointment_date = future_date(&request.appointment_date)?;
    let appointment_time = normalize_time(&request.appointment_time)?;

    let notes = request
        .notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    let appointment = Appointment::new(
        user.user_id.clone(),
        doctor_name,
        specialization,
        appointment_date,
        appointment_time,
        notes,
    );

    state.db()?.insert_appointment(&appointment).await?;
    tracing::info!(appointment_id = %appointment.id, "Appointment booked");

    Ok(Json(json!({
        "success": true,
        "message": "Appointment booked successfully",
        "appointment": appointment,
    })))
}

#[instrument(name = "dashboard::reschedule_appointment", skip(state, user))]
pub async fn reschedule_appointment(
    State(state): State<AppState>,
    user: SessionUser,
    ApiJson(request): ApiJson<RescheduleAppointment>,
) -> Result<Json<Value>, AppError> {
    let id = required(&request.appointment_id, "Appointment id")?;
    let date = future_date(&request.new_date)?;
    let time = normalize_time(&request.new_time)?;

    let db = state.db()?;
    let appointment = db
        .find_appointment(&user.user_id, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Appointment not found".into()))?;

    if appointment.status == AppointmentStatus::Cancelled {
        return Err(AppError::Validation(
            "Cannot reschedule a cancelled appointment".into(),
        ));
    }

    db.update_appointment(&user.user_id, &id, &AppointmentUpdate::Reschedule { date, time })
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment rescheduled successfully",
    })))
}

#[instrument(name = "dashboard::cancel_appointment", skip(state, user))]
pub async fn cancel_appointment(
    State(state): State<AppState>,
    user: SessionUser,
    ApiJson(request): ApiJson<CancelAppointment>,
) -> Result<Json<Value>, AppError> {
    let id = required(&request.appointment_id, "Appointment id")?;

    let updated = state
        .db()?
        .update_appointment(&user.user_id, &id, &AppointmentUpdate::Cancel)
        .await?;
    if !updated {
        return Err(AppError::NotFound("Appointment not found".into()));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Appointment cancelled successfully",
    })))
}

#[instrument(name = "dashboard::chat_history", skip_all)]
pub async fn chat_history(
    State(state): State<AppState>,
    user: SessionUser,
) -> Result<Json<Value>, AppError> {
    let chats = state
        .db()?
        .recent_chats(&user.user_id, state.config.chatbot.history_limit)
        .await?;
    Ok(Json(json!({ "success": true, "chats": chats })))
}
