use crate::config::Config;
use crate::emi;
use crate::errors::AppError;
use crate::models::*;
use crate::storage::LeadStore;
use axum::{
    extract::{rejection::FormRejection, rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::Redirect,
    Form, Json,
};
use chrono::Local;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Page shown after a successful form post.
pub const THANK_YOU_PAGE: &str = "/thankyou.html";

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Where submitted leads are persisted.
    pub store: Arc<dyn LeadStore>,
}

/// Health check endpoint.
///
/// Always reports "healthy" together with the server's local time.
pub async fn health() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: format_timestamp(Local::now()),
        }),
    )
}

/// POST /submit
///
/// HTML form submission. On success the browser is redirected to the thank
/// you page (303 See Other). A body that is not form-encoded is handled as an
/// empty form, so it fails validation on `name`.
///
/// # Returns
///
/// * `Result<Redirect, AppError>` - Redirect on success, 400 on a missing
///   field, 500 if the lead could not be stored.
pub async fn submit_form(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    form: Result<Form<HashMap<String, String>>, FormRejection>,
) -> Result<Redirect, AppError> {
    let form = match form {
        Ok(Form(fields)) => fields,
        Err(rejection) => {
            tracing::debug!("POST /submit - unreadable form body: {}", rejection);
            HashMap::new()
        }
    };

    let referer = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok());
    let lead = Lead::from_form(&form, referer);
    lead.validate_required()?;

    let saved = state.store.save(lead).await.map_err(|e| {
        tracing::error!("Error processing form: {}", e);
        AppError::StorageError(e.to_string())
    })?;
    tracing::info!(
        "Lead captured via form (submitted_at: {})",
        saved.submitted_at().unwrap_or_default()
    );

    Ok(Redirect::to(THANK_YOU_PAGE))
}

/// POST /api/submit
///
/// AJAX submission with a JSON object body. The stored lead keeps the
/// client's fields and has `source` forced to "api".
pub async fn api_submit(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SubmitResponse>, AppError> {
    let mut lead = payload
        .ok()
        .and_then(|Json(value)| Lead::from_json(value))
        .ok_or_else(|| AppError::BadRequest("No data provided".to_string()))?;

    lead.validate_required()?;
    lead.set("source", "api");

    let saved = state.store.save(lead).await.map_err(|e| {
        tracing::error!("Error processing API request: {}", e);
        AppError::StorageError(e.to_string())
    })?;
    tracing::info!(
        "Lead captured via API (submitted_at: {})",
        saved.submitted_at().unwrap_or_default()
    );

    Ok(Json(SubmitResponse {
        success: true,
        message: "Application submitted successfully!".to_string(),
    }))
}

/// POST /api/calculate-emi
///
/// Body `{principal, rate, tenure}`: rate is annual percent, tenure months.
/// Non-positive inputs answer 400; a body that is not a JSON object or holds
/// non-numeric inputs answers 500.
pub async fn calculate_emi(
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<EmiBreakdown>, AppError> {
    let body = match payload {
        Ok(Json(body @ Value::Object(_))) => body,
        Ok(Json(other)) => {
            return Err(AppError::CalculationError(format!(
                "expected a JSON object, got {}",
                other
            )))
        }
        Err(rejection) => {
            return Err(AppError::CalculationError(format!(
                "unreadable body: {}",
                rejection
            )))
        }
    };
    let request: EmiRequest = serde_json::from_value(body)
        .map_err(|e| AppError::CalculationError(e.to_string()))?;

    let breakdown = emi::calculate_from_request(&request)?;
    tracing::debug!(
        "EMI for principal {}: {} x {}",
        breakdown.principal,
        breakdown.emi,
        request.tenure
    );

    Ok(Json(breakdown))
}

/// GET /admin/leads
///
/// Every stored lead, oldest first.
///
/// NOTE: unauthenticated. Anyone who can reach the server can read every
/// lead's contact details.
pub async fn list_leads(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Lead>>, AppError> {
    let leads = state.store.list().await?;
    tracing::debug!("GET /admin/leads - {} leads", leads.len());
    Ok(Json(leads))
}
