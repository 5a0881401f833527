use tracing::{info, warn};

use crate::error::{ValidationError, ValidationFailure};
use crate::process::columns::{Rule, SHIPMENT_COLUMNS};
use crate::process::raw_table::RawTable;
use crate::process::utils::{clean_str, parse_number};

/// Check the whole batch before anything is transformed or loaded.
///
/// Every required column must be present and every ruled column must satisfy
/// its [`Rule`] on every row. All failures are collected; a single one
/// rejects the batch.
pub fn validate(table: &RawTable) -> Result<(), ValidationError> {
    let mut failures = Vec::new();

    for col in SHIPMENT_COLUMNS.iter() {
        let Some(index) = table.column_index(col.source) else {
            failures.push(ValidationFailure::MissingColumn(col.source.to_string()));
            continue;
        };
        let Some(rule) = col.rule else {
            continue;
        };
        for (record, cell) in table.column(index) {
            if !satisfies(rule, cell) {
                failures.push(ValidationFailure::InvalidValue {
                    column: col.source.to_string(),
                    record,
                    value: clean_str(cell).to_string(),
                    expected: describe(rule),
                });
            }
        }
    }

    if failures.is_empty() {
        info!(rows = table.len(), "validation passed");
        Ok(())
    } else {
        warn!(problems = failures.len(), "validation rejected the batch");
        Err(ValidationError { failures })
    }
}

fn satisfies(rule: Rule, cell: &str) -> bool {
    let Some(v) = parse_number(cell) else {
        return false;
    };
    match rule {
        Rule::Key => v.fract() == 0.0 && v >= i32::MIN as f64 && v <= i32::MAX as f64,
        Rule::Between(lo, hi) => v >= lo as f64 && v <= hi as f64,
        Rule::OneOf(allowed) => allowed.iter().any(|&a| v == a as f64),
    }
}

fn describe(rule: Rule) -> String {
    match rule {
        Rule::Key => "a whole number in INTEGER range".to_string(),
        Rule::Between(lo, hi) => format!("a number between {} and {}", lo, hi),
        Rule::OneOf(allowed) => format!("one of {:?}", allowed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::tests::HEADER;

    fn table(rows: &[&str]) -> RawTable {
        RawTable {
            headers: HEADER.split(',').map(str::to_string).collect(),
            rows: rows
                .iter()
                .map(|r| r.split(',').map(str::to_string).collect())
                .collect(),
        }
    }

    #[test]
    fn accepts_well_formed_batch() {
        let t = table(&[
            "1,D,Flight,4,2,177,3,low,F,44,1233,1",
            "2,F,Ship,,5,216,,medium,M,,3088,0",
            "3,A,Road,abc,1.0,x,3,high,F,10,heavy,1.0",
        ]);
        assert_eq!(validate(&t), Ok(()));
    }

    #[test]
    fn missing_column_rejects_batch() {
        let mut t = table(&["1,D,Flight,4,2,177,3,low,F,44,1233,1"]);
        t.headers[10] = "Weight".to_string();

        let err = validate(&t).unwrap_err();
        assert_eq!(err.missing_columns().collect::<Vec<_>>(), vec!["Weight_in_gms"]);
    }

    #[test]
    fn out_of_range_values_are_enumerated() {
        let t = table(&[
            "1,D,Flight,4,2,177,3,low,F,44,1233,1",
            "2,D,Flight,4,6,177,3,low,F,44,1233,1",
            "3,D,Flight,4,3,177,3,low,F,44,1233,2",
            "4,D,Flight,4,,177,3,low,F,44,1233,yes",
        ]);
        let err = validate(&t).unwrap_err();

        let invalid: Vec<(String, usize, String)> = err
            .failures
            .iter()
            .map(|f| match f {
                ValidationFailure::InvalidValue {
                    column,
                    record,
                    value,
                    ..
                } => (column.clone(), *record, value.clone()),
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(
            invalid,
            vec![
                ("Customer_rating".to_string(), 2, "6".to_string()),
                ("Customer_rating".to_string(), 4, "".to_string()),
                ("Reached.on.Time_Y.N".to_string(), 3, "2".to_string()),
                ("Reached.on.Time_Y.N".to_string(), 4, "yes".to_string()),
            ]
        );
    }

    #[test]
    fn key_must_be_a_whole_number() {
        let t = table(&[
            "S1,D,Flight,4,2,177,3,low,F,44,1233,1",
            "2.5,D,Flight,4,2,177,3,low,F,44,1233,1",
            ",D,Flight,4,2,177,3,low,F,44,1233,1",
            "7.0,D,Flight,4,2,177,3,low,F,44,1233,1",
        ]);
        let err = validate(&t).unwrap_err();
        let records: Vec<usize> = err
            .failures
            .iter()
            .filter_map(|f| match f {
                ValidationFailure::InvalidValue { column, record, .. } if column == "ID" => {
                    Some(*record)
                }
                _ => None,
            })
            .collect();
        assert_eq!(records, vec![1, 2, 3]);
    }

    #[test]
    fn key_outside_integer_range_names_the_range() {
        let t = table(&["3000000000,D,Flight,4,2,177,3,low,F,44,1233,1"]);
        let err = validate(&t).unwrap_err();
        assert_eq!(
            err.failures,
            vec![ValidationFailure::InvalidValue {
                column: "ID".to_string(),
                record: 1,
                value: "3000000000".to_string(),
                expected: "a whole number in INTEGER range".to_string(),
            }]
        );
    }

    #[test]
    fn empty_batch_only_checks_columns() {
        assert_eq!(validate(&table(&[])), Ok(()));
    }
}
