//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, info, warn};

use super::AppState;
use super::types::{CalculateRequest, ErrorResponse, TariffResponse};
use crate::error::QuoteError;
use crate::quote::CalculationResult;

/// Failure modes of a handler, mapped onto HTTP statuses.
#[derive(Debug)]
pub enum ApiError {
    /// Client-side problem: 400 with the message.
    BadRequest(String),
    /// Anything else: 500 with a generic message.
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error".to_string(),
            ),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

/// Quotes an installation for the posted monthly bill.
///
/// `POST /api/calculate` with `{"gastoMensual": 5000}` → 200 + `CalculationResult`
/// Missing, null, non-numeric or non-positive amount → 400 + `ErrorResponse`
/// Degenerate projection or any other engine fault → 500 + `ErrorResponse`
pub async fn calculate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CalculateRequest>, JsonRejection>,
) -> Result<Json<CalculationResult>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(%rejection, "rejected request body");
        ApiError::BadRequest(format!("invalid request body: {}", rejection.body_text()))
    })?;

    let Some(bill) = request.gasto_mensual else {
        warn!("request without gastoMensual");
        return Err(ApiError::BadRequest(
            "gastoMensual is required and must be a number".to_string(),
        ));
    };

    match state.engine.quote(bill) {
        Ok(result) => {
            info!(bill, panels = result.numero_paneles, "quote served");
            Ok(Json(result))
        }
        Err(QuoteError::InvalidInput(message)) => {
            warn!(bill, %message, "invalid bill");
            Err(ApiError::BadRequest(message))
        }
        Err(e) => {
            error!(bill, error = %e, "quote failed");
            Err(ApiError::Internal)
        }
    }
}

/// Returns the tariff table and constants in use.
///
/// `GET /api/tariff` → 200 + `TariffResponse`
pub async fn get_tariff(State(state): State<Arc<AppState>>) -> Json<TariffResponse> {
    Json(TariffResponse::from(&state.engine))
}
