//! The per-(item, warehouse, client) stock snapshot.

use log::error;
use rust_decimal::Decimal;

use crate::error::{store_failure, BalanceFailure, InventoryError, InventoryResult};
use crate::models::{
    BalanceKey, BalanceSnapshot, ConversionRates, Direction, Rate, StockQuery, StockRow,
    UnitQuantities,
};
use crate::store::{Store, StoreTx};

/// The inputs of one snapshot update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceCommit {
    pub key: BalanceKey,
    pub direction: Direction,
    /// Declared balance before the movement; must match the stored big quantity.
    pub prior_value: i64,
    /// Unsigned big-unit quantity moved.
    pub big_quantity: Decimal,
    pub rates: ConversionRates,
}

impl BalanceCommit {
    pub fn delta(&self) -> UnitQuantities {
        UnitQuantities::from_big(self.direction, self.big_quantity, self.rates)
    }
}

/// Applies a movement to its snapshot inside the caller's transaction and
/// returns the snapshot as it now stands.
///
/// The first movement for a triple seeds the snapshot. Later movements are
/// applied only if the stored big quantity equals the declared prior value.
pub async fn commit_balance(tx: &mut dyn StoreTx, commit: &BalanceCommit) -> InventoryResult<BalanceSnapshot> {
    let delta = commit.delta();

    let result: InventoryResult<BalanceSnapshot> = match tx.lock_snapshot(&commit.key).await {
        Err(err) => Err(store_failure(err, BalanceFailure::Store)),
        Ok(None) => {
            let seeded = BalanceSnapshot {
                key: commit.key,
                quantities: delta,
            };
            tx.insert_snapshot(&seeded)
                .await
                .map(|_| seeded)
                .map_err(|err| store_failure(err, BalanceFailure::Store))
        }
        Ok(Some(current)) => {
            let expected = Decimal::from(commit.prior_value);
            match tx.apply_snapshot_delta(&commit.key, &delta, expected).await {
                Ok(0) => Err(BalanceFailure::GuardMismatch {
                    expected: commit.prior_value,
                    found: current.quantities.big,
                }
                .into()),
                Ok(_) => Ok(BalanceSnapshot {
                    key: commit.key,
                    quantities: current.quantities + delta,
                }),
                Err(err) => Err(store_failure(err, BalanceFailure::Store)),
            }
        }
    };

    result.map_err(|err| {
        error!(
            "balance commit failed for item {} warehouse {} client {}: {}",
            commit.key.item_id, commit.key.warehouse_id, commit.key.client_id, err
        );
        err
    })
}

/// Conversion rates of an item plus the cartons held for (warehouse, client).
pub async fn query_rate(store: &dyn Store, key: &BalanceKey) -> InventoryResult<Rate> {
    store.rate(key).await?.ok_or(InventoryError::NotFound("item"))
}

pub async fn search_stock(store: &dyn Store, query: &StockQuery) -> InventoryResult<Vec<StockRow>> {
    Ok(store.stock(query).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn commit(direction: Direction, prior_value: i64, big: i64) -> BalanceCommit {
        BalanceCommit {
            key: BalanceKey {
                item_id: 1,
                warehouse_id: 2,
                client_id: 3,
            },
            direction,
            prior_value,
            big_quantity: Decimal::from(big),
            rates: ConversionRates {
                small_per_big: Decimal::from(12),
                raw_per_small: Decimal::from(10),
            },
        }
    }

    #[tokio::test]
    async fn first_movement_seeds_the_snapshot() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();

        let snapshot = commit_balance(tx.as_mut(), &commit(Direction::In, 0, 5)).await.unwrap();
        assert_eq!(snapshot.quantities.big, Decimal::from(5));
        assert_eq!(snapshot.quantities.small, Decimal::from(60));
        assert_eq!(snapshot.quantities.item, Decimal::from(600));
    }

    #[tokio::test]
    async fn later_movements_are_guarded_by_prior_value() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        commit_balance(tx.as_mut(), &commit(Direction::In, 0, 5)).await.unwrap();

        let err = commit_balance(tx.as_mut(), &commit(Direction::Out, 4, 2)).await.unwrap_err();
        assert_eq!(
            err,
            InventoryError::BalanceCommitFailed(BalanceFailure::GuardMismatch {
                expected: 4,
                found: Decimal::from(5),
            })
        );

        let snapshot = commit_balance(tx.as_mut(), &commit(Direction::Out, 5, 2)).await.unwrap();
        assert_eq!(snapshot.quantities.big, Decimal::from(3));
        assert_eq!(snapshot.quantities.item, Decimal::from(360));
    }

    #[tokio::test]
    async fn rate_for_unknown_item_is_not_found() {
        let store = MemoryStore::new();
        let key = commit(Direction::In, 0, 5).key;
        assert_eq!(query_rate(&store, &key).await.unwrap_err(), InventoryError::NotFound("item"));
    }

    #[tokio::test]
    async fn outage_is_not_reported_as_a_balance_failure() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        commit_balance(tx.as_mut(), &commit(Direction::In, 0, 5)).await.unwrap();
        store.set_reachable(false);

        let err = commit_balance(tx.as_mut(), &commit(Direction::Out, 5, 2)).await.unwrap_err();
        assert!(matches!(err, InventoryError::StoreUnavailable(_)));
    }
}
