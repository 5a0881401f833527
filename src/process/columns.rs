//! Static description of the shipments feed: source header, target column,
//! type, missing-value default and validation rule, in table order.

use arrow::datatypes::{DataType, Field, Schema};

pub const TARGET_SCHEMA: &str = "warehouse";
pub const TARGET_TABLE: &str = "shipments";
pub const PRIMARY_KEY: &str = "id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Text,
}

/// Value rule checked by the validator before anything is transformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Whole number inside the INTEGER range; never missing.
    Key,
    /// Numeric, inclusive bounds.
    Between(i64, i64),
    /// Numeric, one of the listed values.
    OneOf(&'static [i64]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub source: &'static str,
    pub target: &'static str,
    pub kind: ColumnKind,
    /// Replacement for a missing or non-numeric integer cell.
    pub fill: Option<i32>,
    pub rule: Option<Rule>,
}

const fn text(source: &'static str, target: &'static str) -> ColumnDef {
    ColumnDef {
        source,
        target,
        kind: ColumnKind::Text,
        fill: None,
        rule: None,
    }
}

const fn integer(source: &'static str, target: &'static str) -> ColumnDef {
    ColumnDef {
        source,
        target,
        kind: ColumnKind::Integer,
        fill: None,
        rule: None,
    }
}

const fn filled(source: &'static str, target: &'static str, fill: i32) -> ColumnDef {
    ColumnDef {
        fill: Some(fill),
        ..integer(source, target)
    }
}

const fn ruled(source: &'static str, target: &'static str, rule: Rule) -> ColumnDef {
    ColumnDef {
        rule: Some(rule),
        ..integer(source, target)
    }
}

pub const SHIPMENT_COLUMNS: [ColumnDef; 12] = [
    ruled("ID", "id", Rule::Key),
    text("Warehouse_block", "warehouse_block"),
    text("Mode_of_Shipment", "mode_of_shipment"),
    filled("Customer_care_calls", "customer_care_calls", 0),
    ruled("Customer_rating", "customer_rating", Rule::Between(1, 5)),
    integer("Cost_of_the_Product", "cost_of_the_product"),
    filled("Prior_purchases", "prior_purchases", 0),
    text("Product_importance", "product_importance"),
    text("Gender", "gender"),
    filled("Discount_offered", "discount_offered", 0),
    integer("Weight_in_gms", "weight_in_gms"),
    ruled("Reached.on.Time_Y.N", "reached_on_time", Rule::OneOf(&[0, 1])),
];

/// Index of the primary key inside [`SHIPMENT_COLUMNS`].
pub const KEY_COLUMN: usize = 0;

/// `schema.table`, as used in SQL.
pub fn qualified_table() -> String {
    format!("{}.{}", TARGET_SCHEMA, TARGET_TABLE)
}

/// Arrow schema of the transformed batch.
pub fn arrow_schema() -> Schema {
    let fields: Vec<Field> = SHIPMENT_COLUMNS
        .iter()
        .map(|c| {
            let ty = match c.kind {
                ColumnKind::Integer => DataType::Int32,
                ColumnKind::Text => DataType::Utf8,
            };
            Field::new(c.target, ty, c.target != PRIMARY_KEY)
        })
        .collect();
    Schema::new(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_column_is_first() {
        assert_eq!(SHIPMENT_COLUMNS[KEY_COLUMN].target, PRIMARY_KEY);
        assert_eq!(SHIPMENT_COLUMNS[KEY_COLUMN].rule, Some(Rule::Key));
    }

    #[test]
    fn targets_are_snake_case_and_unique() {
        let mut seen = std::collections::HashSet::new();
        for c in SHIPMENT_COLUMNS.iter() {
            assert!(
                c.target
                    .chars()
                    .all(|ch| ch.is_ascii_lowercase() || ch == '_'),
                "{}",
                c.target
            );
            assert!(seen.insert(c.target));
        }
    }

    #[test]
    fn schema_nullability() {
        let schema = arrow_schema();
        assert_eq!(schema.fields().len(), SHIPMENT_COLUMNS.len());
        assert!(!schema.field_with_name("id").unwrap().is_nullable());
        assert!(schema.field_with_name("weight_in_gms").unwrap().is_nullable());
        assert_eq!(
            schema.field_with_name("gender").unwrap().data_type(),
            &DataType::Utf8
        );
    }
}
