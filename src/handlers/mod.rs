pub mod auth;
pub mod master;
pub mod search;
pub mod transactions;

use std::str::FromStr;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{BalanceFailure, InventoryError, InventoryResult, ResolutionFailure};

/// Body of every mutation response.
#[derive(Debug, Serialize)]
pub struct Outcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Outcome {
    pub fn ok() -> Json<Self> {
        Json(Self {
            success: true,
            reason: None,
        })
    }
}

/// Response for registrations that create a row.
#[derive(Debug, Serialize)]
pub struct Created {
    pub success: bool,
    pub id: i64,
}

impl Created {
    pub fn new(id: i64) -> Json<Self> {
        Json(Self { success: true, id })
    }
}

impl InventoryError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationRejected(_) | Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::ResolutionFailed(ResolutionFailure::DuplicateTracker(_))
            | Self::BalanceCommitFailed(BalanceFailure::GuardMismatch { .. }) => StatusCode::CONFLICT,
            Self::ResolutionFailed(ResolutionFailure::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ResolutionFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::PersistenceFailed(_) | Self::BalanceCommitFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for InventoryError {
    fn into_response(self) -> Response {
        let body = Outcome {
            success: false,
            reason: Some(self.to_string()),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

pub async fn root() -> &'static str {
    "OK"
}

// Form fields arrive as text; these turn them into typed values.

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub(crate) fn required_id(name: &str, value: &Option<String>) -> InventoryResult<i64> {
    optional_id(name, value)?.ok_or_else(|| InventoryError::invalid_input(format!("{name} is required")))
}

pub(crate) fn optional_id(name: &str, value: &Option<String>) -> InventoryResult<Option<i64>> {
    present(value)
        .map(|v| {
            v.parse::<i64>()
                .map_err(|_| InventoryError::invalid_input(format!("{name} must be a whole number")))
        })
        .transpose()
}

pub(crate) fn required_decimal(name: &str, value: &Option<String>) -> InventoryResult<Decimal> {
    optional_decimal(name, value)?.ok_or_else(|| InventoryError::invalid_input(format!("{name} is required")))
}

pub(crate) fn optional_decimal(name: &str, value: &Option<String>) -> InventoryResult<Option<Decimal>> {
    present(value)
        .map(|v| {
            Decimal::from_str(v).map_err(|_| InventoryError::invalid_input(format!("{name} must be a number")))
        })
        .transpose()
}

pub(crate) fn optional_date(name: &str, value: &Option<String>) -> InventoryResult<Option<NaiveDate>> {
    present(value)
        .map(|v| {
            NaiveDate::parse_from_str(v, "%Y-%m-%d")
                .map_err(|_| InventoryError::invalid_input(format!("{name} must be a YYYY-MM-DD date")))
        })
        .transpose()
}

pub(crate) fn required_text(name: &str, value: &Option<String>) -> InventoryResult<String> {
    present(value)
        .map(str::to_string)
        .ok_or_else(|| InventoryError::invalid_input(format!("{name} is required")))
}

pub(crate) fn flag(value: &Option<String>) -> bool {
    matches!(present(value), Some("1" | "true" | "on" | "yes"))
}

/// Space- or comma-separated id list; empty means "any".
pub(crate) fn id_list(name: &str, value: &Option<String>) -> InventoryResult<Vec<i64>> {
    let Some(raw) = present(value) else {
        return Ok(Vec::new());
    };
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>()
                .map_err(|_| InventoryError::invalid_input(format!("{name} must list whole numbers")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    #[test]
    fn blank_fields_count_as_missing() {
        assert_eq!(optional_id("clientId", &some("  ")).unwrap(), None);
        assert_eq!(optional_id("clientId", &None).unwrap(), None);
        assert!(required_id("clientId", &some("")).is_err());
        assert_eq!(required_id("clientId", &some(" 7 ")).unwrap(), 7);
    }

    #[test]
    fn numbers_and_dates_parse() {
        assert_eq!(required_decimal("v", &some("12.50")).unwrap(), Decimal::new(1250, 2));
        assert!(required_decimal("v", &some("twelve")).is_err());
        assert_eq!(
            optional_date("d", &some("2024-03-01")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert!(optional_date("d", &some("01/03/2024")).is_err());
    }

    #[test]
    fn id_lists_split_on_spaces_and_commas() {
        assert_eq!(id_list("itemId", &some("1 2,3")).unwrap(), vec![1, 2, 3]);
        assert!(id_list("itemId", &None).unwrap().is_empty());
        assert!(id_list("itemId", &some("1 x")).is_err());
    }

    #[test]
    fn errors_map_to_status_codes() {
        assert_eq!(InventoryError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            InventoryError::ResolutionFailed(ResolutionFailure::DuplicateTracker("BE-1".into())).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            InventoryError::ResolutionFailed(ResolutionFailure::UnknownOwner {
                kind: "bill of entry",
                owner_id: 999,
            })
            .status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(InventoryError::NotFound("item").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            InventoryError::StoreUnavailable("down".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
