//! Links a movement to its bill of entry or sales invoice.

use log::warn;

use crate::error::{store_failure, InventoryResult, ResolutionFailure};
use crate::models::{Direction, DocumentRef, NewDocument};
use crate::store::{StoreError, StoreTx};

/// Returns the id of the document a movement belongs to, creating it when
/// the reference names a new tracker. Runs inside the movement's transaction.
///
/// `owner_id` is the client for inbound movements and the customer for
/// outbound ones.
pub async fn resolve_document(
    tx: &mut dyn StoreTx,
    direction: Direction,
    document: &DocumentRef,
    owner_id: Option<i64>,
) -> InventoryResult<i64> {
    let kind = direction.document_kind();

    let resolved: InventoryResult<i64> = match document {
        DocumentRef::Id { id } if *id > 0 => Ok(*id),
        DocumentRef::Id { id } => Err(ResolutionFailure::Unresolvable(*id).into()),
        DocumentRef::Existing { tracker } if tracker.trim().is_empty() => {
            Err(ResolutionFailure::EmptyTracker(kind.label()).into())
        }
        DocumentRef::Existing { tracker } => match tx.find_document(kind, tracker.trim()).await {
            Ok(Some(id)) => Ok(id),
            Ok(None) => Err(ResolutionFailure::UnknownTracker(tracker.trim().to_string()).into()),
            Err(err) => Err(store_failure(err, ResolutionFailure::Store)),
        },
        DocumentRef::New { tracker, entry_date } => {
            let tracker = tracker.trim();
            match owner_id {
                _ if tracker.is_empty() => Err(ResolutionFailure::EmptyTracker(kind.label()).into()),
                None => Err(ResolutionFailure::MissingOwner(kind.label()).into()),
                Some(owner_id) => {
                    let new = NewDocument {
                        kind,
                        tracker: tracker.to_string(),
                        entry_date: *entry_date,
                        owner_id,
                    };
                    match tx.insert_document(&new).await {
                        Ok(id) => Ok(id),
                        Err(StoreError::Conflict(_)) => {
                            Err(ResolutionFailure::DuplicateTracker(tracker.to_string()).into())
                        }
                        Err(StoreError::MissingReference(_)) => Err(ResolutionFailure::UnknownOwner {
                            kind: kind.label(),
                            owner_id,
                        }
                        .into()),
                        Err(err) => Err(store_failure(err, ResolutionFailure::Store)),
                    }
                }
            }
        }
    };

    resolved.map_err(|err| {
        warn!("{} resolution failed: {}", kind.label(), err);
        err
    })
}
