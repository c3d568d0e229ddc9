use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Which way goods cross the warehouse door.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }

    /// Applies the direction's sign to an unsigned big-unit quantity.
    pub fn signed(&self, quantity: Decimal) -> Decimal {
        match self {
            Self::In => quantity,
            Self::Out => -quantity,
        }
    }

    pub fn document_kind(&self) -> DocumentKind {
        match self {
            Self::In => DocumentKind::BillOfEntry,
            Self::Out => DocumentKind::SalesInvoice,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "in" => Ok(Self::In),
            "out" => Ok(Self::Out),
            other => Err(format!("unknown direction '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    BillOfEntry,
    SalesInvoice,
}

impl DocumentKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::BillOfEntry => "bill of entry",
            Self::SalesInvoice => "sales invoice",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BillOfEntry {
    pub id: i64,
    pub tracker: String,
    pub entry_date: NaiveDate,
    pub client_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SalesInvoice {
    pub id: i64,
    pub tracker: String,
    pub entry_date: NaiveDate,
    pub customer_id: i64,
    pub customer_name: String,
}

/// Insert payload for either document table. The owner is a client for
/// bills of entry and a customer for sales invoices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub kind: DocumentKind,
    pub tracker: String,
    pub entry_date: NaiveDate,
    pub owner_id: i64,
}

/// How a movement names its parent document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DocumentRef {
    /// First movement under a tracker: create the document.
    New { tracker: String, entry_date: NaiveDate },
    /// Document already exists; find it by tracker.
    Existing { tracker: String },
    /// Caller already holds the document id.
    Id { id: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_parses_and_signs() {
        assert_eq!("in".parse::<Direction>(), Ok(Direction::In));
        assert_eq!(" out ".parse::<Direction>(), Ok(Direction::Out));
        assert!("sideways".parse::<Direction>().is_err());

        assert_eq!(Direction::Out.signed(Decimal::from(5)), Decimal::from(-5));
        assert_eq!(Direction::In.signed(Decimal::from(5)), Decimal::from(5));
    }

    #[test]
    fn inbound_sorts_before_outbound() {
        assert!(Direction::In < Direction::Out);
        assert_eq!(Direction::In.document_kind(), DocumentKind::BillOfEntry);
    }
}
