use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Warehouse {
    pub id: i64,
    pub name: String,
    pub location: String,
    pub gstin: Option<String>,
    pub contact_name: Option<String>,
    pub contact_number: Option<String>,
}

impl Warehouse {
    /// Display form used by listings and the overview: `name, location`.
    pub fn label(&self) -> String {
        format!("{}, {}", self.name, self.location)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWarehouse {
    pub name: String,
    pub location: String,
    pub gstin: Option<String>,
    pub contact_name: Option<String>,
    pub contact_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseLabel {
    pub warehouse_id: i64,
    pub warehouse_name: String,
}

impl From<&Warehouse> for WarehouseLabel {
    fn from(warehouse: &Warehouse) -> Self {
        Self {
            warehouse_id: warehouse.id,
            warehouse_name: warehouse.label(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseGroup {
    pub warehouse_location: String,
    pub warehouse_id: Vec<i64>,
}

/// Warehouse ids bucketed by location, locations in ascending order.
pub fn group_by_location(warehouses: &[Warehouse]) -> Vec<WarehouseGroup> {
    let mut groups: BTreeMap<&str, Vec<i64>> = BTreeMap::new();
    for warehouse in warehouses {
        groups
            .entry(warehouse.location.as_str())
            .or_default()
            .push(warehouse.id);
    }

    groups
        .into_iter()
        .map(|(location, ids)| WarehouseGroup {
            warehouse_location: location.to_string(),
            warehouse_id: ids,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: i64,
    pub name: String,
}

/// Item master row. Conversion factors chain big -> small -> raw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub variant: String,
    pub hsn_code: String,
    pub uom_raw: String,
    pub uom_small: String,
    pub uom_big: String,
    pub raw_per_small: Decimal,
    pub small_per_big: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub name: String,
    pub variant: String,
    pub hsn_code: String,
    pub uom_raw: String,
    pub uom_small: String,
    pub uom_big: String,
    pub raw_per_small: Decimal,
    pub small_per_big: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemGroup {
    pub name: String,
    pub description: Vec<String>,
    pub item_id: Vec<i64>,
}

/// Items sharing a name collapse into one entry listing their variants and ids.
pub fn group_by_name(items: &[Item]) -> Vec<ItemGroup> {
    let mut groups: BTreeMap<&str, ItemGroup> = BTreeMap::new();
    for item in items {
        let group = groups.entry(item.name.as_str()).or_insert_with(|| ItemGroup {
            name: item.name.clone(),
            description: Vec::new(),
            item_id: Vec::new(),
        });
        group.description.push(item.variant.clone());
        group.item_id.push(item.id);
    }
    groups.into_values().collect()
}

/// Item master columns a caller may list distinct values of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemColumn {
    Name,
    Variant,
    HsnCode,
}

impl ItemColumn {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "name" | "itemName" => Some(Self::Name),
            "variant" | "itemVariant" => Some(Self::Variant),
            "hsn_code" | "hsnCode" => Some(Self::HsnCode),
            _ => None,
        }
    }

    pub fn value<'a>(&self, item: &'a Item) -> &'a str {
        match self {
            Self::Name => &item.name,
            Self::Variant => &item.variant,
            Self::HsnCode => &item.hsn_code,
        }
    }
}

/// Distinct values of one column, sorted.
pub fn distinct_column(items: &[Item], column: ItemColumn) -> Vec<String> {
    let mut values: Vec<String> = items.iter().map(|i| column.value(i).to_string()).collect();
    values.sort();
    values.dedup();
    values
}

/// Conversion details used by clients to pre-fill movement math.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rate {
    pub raw_per_small: Decimal,
    pub small_per_big: Decimal,
    pub carton_quantity: Decimal,
    pub small_unit: String,
    pub medium_unit: String,
    pub big_unit: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockQuery {
    pub item_ids: Vec<i64>,
    pub warehouse_ids: Vec<i64>,
    pub client_ids: Vec<i64>,
}

impl StockQuery {
    /// Empty id lists do not constrain the search.
    pub fn matches(&self, item_id: i64, warehouse_id: i64, client_id: i64) -> bool {
        let hit = |ids: &[i64], id: i64| ids.is_empty() || ids.contains(&id);
        hit(&self.item_ids, item_id)
            && hit(&self.warehouse_ids, warehouse_id)
            && hit(&self.client_ids, client_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StockRow {
    pub item_name: String,
    pub item_variant: String,
    pub hsn_code: String,
    pub item_quantity: Decimal,
    pub uom_raw: String,
    pub smallbox_quantity: Decimal,
    pub uom_small: String,
    pub bigcarton_quantity: Decimal,
    pub uom_big: String,
    pub warehouse_name: String,
    pub warehouse_location: String,
    pub client_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warehouse(id: i64, name: &str, location: &str) -> Warehouse {
        Warehouse {
            id,
            name: name.to_string(),
            location: location.to_string(),
            gstin: None,
            contact_name: None,
            contact_number: None,
        }
    }

    fn item(id: i64, name: &str, variant: &str) -> Item {
        Item {
            id,
            name: name.to_string(),
            variant: variant.to_string(),
            hsn_code: "8471".to_string(),
            uom_raw: "pcs".to_string(),
            uom_small: "box".to_string(),
            uom_big: "carton".to_string(),
            raw_per_small: Decimal::from(10),
            small_per_big: Decimal::from(12),
        }
    }

    #[test]
    fn warehouses_group_by_location() {
        let groups = group_by_location(&[
            warehouse(1, "North", "Pune"),
            warehouse(2, "Dock", "Chennai"),
            warehouse(3, "South", "Pune"),
        ]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].warehouse_location, "Chennai");
        assert_eq!(groups[1].warehouse_id, vec![1, 3]);
    }

    #[test]
    fn items_group_by_name_with_variants() {
        let groups = group_by_name(&[item(1, "Cable", "1m"), item(2, "Cable", "2m"), item(3, "Adapter", "EU")]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].name, "Cable");
        assert_eq!(groups[1].description, vec!["1m", "2m"]);
        assert_eq!(groups[1].item_id, vec![1, 2]);
    }

    #[test]
    fn item_column_whitelist() {
        assert_eq!(ItemColumn::parse("variant"), Some(ItemColumn::Variant));
        assert_eq!(ItemColumn::parse("id; DROP TABLE items"), None);

        let values = distinct_column(&[item(1, "Cable", "1m"), item(2, "Cable", "2m")], ItemColumn::Name);
        assert_eq!(values, vec!["Cable"]);
    }

    #[test]
    fn empty_stock_query_matches_everything() {
        let query = StockQuery::default();
        assert!(query.matches(1, 2, 3));

        let query = StockQuery {
            item_ids: vec![1],
            ..StockQuery::default()
        };
        assert!(query.matches(1, 9, 9));
        assert!(!query.matches(2, 9, 9));
    }
}
