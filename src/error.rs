//! Error taxonomy shared by the ledger components and the HTTP layer.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::store::StoreError;

pub type InventoryResult<T> = Result<T, InventoryError>;

/// Which of the three admission checks rejected a movement.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    #[error("prior {prior} + change {change} does not equal result {result}")]
    BalanceArithmetic { prior: i64, change: i64, result: i64 },

    #[error("outbound movement raises stock from {prior} to {result}")]
    OutflowIncreasesStock { prior: i64, result: i64 },

    #[error("inbound movement lowers stock from {prior} to {result}")]
    InflowDecreasesStock { prior: i64, result: i64 },

    #[error("total pieces must be positive, got {0}")]
    NonPositivePieces(Decimal),

    #[error("total pieces {declared} does not match converted quantity {expected}")]
    PiecesMismatch { expected: Decimal, declared: Decimal },

    #[error("value components add up to {components_cents} cents, total is {total_cents} cents")]
    ValueMismatch {
        components_cents: Decimal,
        total_cents: Decimal,
    },
}

impl ValidationFailure {
    /// Name of the check that failed: `content`, `quantity` or `value`.
    pub fn check(&self) -> &'static str {
        match self {
            Self::BalanceArithmetic { .. }
            | Self::OutflowIncreasesStock { .. }
            | Self::InflowDecreasesStock { .. } => "content",
            Self::NonPositivePieces(_) | Self::PiecesMismatch { .. } => "quantity",
            Self::ValueMismatch { .. } => "value",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolutionFailure {
    #[error("tracker '{0}' is already in use")]
    DuplicateTracker(String),

    #[error("no document with tracker '{0}'")]
    UnknownTracker(String),

    #[error("a new {0} needs a tracker")]
    EmptyTracker(&'static str),

    #[error("{0} needs an owner")]
    MissingOwner(&'static str),

    #[error("{kind} owner {owner_id} does not exist")]
    UnknownOwner { kind: &'static str, owner_id: i64 },

    #[error("document id {0} cannot be resolved")]
    Unresolvable(i64),

    #[error("store error: {0}")]
    Store(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BalanceFailure {
    #[error("declared prior balance {expected} does not match stored balance {found}")]
    GuardMismatch { expected: i64, found: Decimal },

    #[error("store error: {0}")]
    Store(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InventoryError {
    #[error("validation rejected ({}): {0}", .0.check())]
    ValidationRejected(#[from] ValidationFailure),

    #[error("document resolution failed: {0}")]
    ResolutionFailed(#[from] ResolutionFailure),

    #[error("ledger write failed: {0}")]
    PersistenceFailed(String),

    #[error("balance commit failed: {0}")]
    BalanceCommitFailed(#[from] BalanceFailure),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("missing permission: {0}")]
    Forbidden(&'static str),
}

impl InventoryError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

impl From<StoreError> for InventoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => Self::StoreUnavailable(msg),
            StoreError::Conflict(msg) | StoreError::MissingReference(msg) | StoreError::Query(msg) => {
                Self::PersistenceFailed(msg)
            }
        }
    }
}

/// Keeps a transport failure as `StoreUnavailable`; any other store error
/// becomes the component failure built by `wrap`.
pub(crate) fn store_failure<F>(err: StoreError, wrap: impl FnOnce(String) -> F) -> InventoryError
where
    F: Into<InventoryError>,
{
    match err {
        StoreError::Unavailable(msg) => InventoryError::StoreUnavailable(msg),
        other => wrap(other.to_string()).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_name_their_check() {
        let err = InventoryError::from(ValidationFailure::NonPositivePieces(Decimal::ZERO));
        assert_eq!(
            err.to_string(),
            "validation rejected (quantity): total pieces must be positive, got 0"
        );
    }

    #[test]
    fn store_errors_keep_transport_failures_apart() {
        let err = InventoryError::from(StoreError::Unavailable("pool closed".into()));
        assert!(matches!(err, InventoryError::StoreUnavailable(_)));

        let err = InventoryError::from(StoreError::Conflict("duplicate".into()));
        assert!(matches!(err, InventoryError::PersistenceFailed(_)));
    }

    #[test]
    fn component_failures_do_not_swallow_outages() {
        let err = store_failure(StoreError::Unavailable("pool timed out".into()), BalanceFailure::Store);
        assert_eq!(err, InventoryError::StoreUnavailable("pool timed out".into()));

        let err = store_failure(StoreError::Query("syntax".into()), BalanceFailure::Store);
        assert!(matches!(err, InventoryError::BalanceCommitFailed(BalanceFailure::Store(_))));

        let err = store_failure(StoreError::Query("disk full".into()), InventoryError::PersistenceFailed);
        assert!(matches!(err, InventoryError::PersistenceFailed(_)));
    }
}
