//! # Air-Freight Pivot Transform
//!
//! Air-freight rates are edited and printed as a carrier x weight-break
//! matrix, but stored as a flat list of per-carrier [`ChargeRow`]s (one
//! row per priced bracket). This module interconverts the two views.
//!
//! The matrix knows exactly six bracket columns
//! ([`WEIGHT_BREAKS`]): `-45kg, +45kg, +100kg, +300kg, +500kg, +1000kg`.
//! A round trip through the pivot preserves every row priced under one
//! of those labels and silently drops rows under any other label; that
//! loss is a documented property of the matrix editor, regression-tested
//! below, not an accident to be "fixed" here.
//!
//! ## Example
//!
//! ```rust
//! use quote_core::document::ChargeRow;
//! use quote_core::pivot::{to_pivoted, to_rows};
//!
//! let mut row = ChargeRow::empty();
//! row.carrier = "CX".to_string();
//! row.unit_type = "+100kg".to_string();
//! row.amount = "3.20".to_string();
//!
//! let pivoted = to_pivoted(&[row]);
//! assert_eq!(pivoted.len(), 1);
//! assert_eq!(pivoted[0].breaks.get("+100kg").unwrap(), "3.20");
//!
//! let rows = to_rows(&pivoted);
//! assert_eq!(rows.len(), 6); // one row per standard bracket
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::charges::row_total;
use crate::document::{ChargeBasis, ChargeRow, WEIGHT_BREAKS};

/// One matrix row: a carrier with its shared fields and a map from
/// weight-break label to amount.
///
/// Transient, edit-time only - never persisted. Amounts stay strings
/// so a blank cell survives as a blank cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotedRow {
    pub carrier: String,
    pub currency: String,
    pub transit_time: String,
    pub number_of_routing: String,
    pub surcharge: String,
    pub frequency: String,
    pub remarks: String,

    /// Amount per weight-break label; absent label = blank cell
    pub breaks: HashMap<String, String>,
}

impl PivotedRow {
    fn from_first_row(row: &ChargeRow) -> Self {
        PivotedRow {
            carrier: row.carrier.clone(),
            currency: row.currency.clone(),
            transit_time: row.transit_time.clone(),
            number_of_routing: row.number_of_routing.clone(),
            surcharge: row.surcharge.clone(),
            frequency: row.frequency.clone(),
            remarks: row.remarks.clone(),
            breaks: HashMap::new(),
        }
    }
}

/// Flat rows -> carrier x weight-break matrix.
///
/// Rows group by carrier in first-encounter order; the empty string is
/// a valid carrier key (a matrix being typed in from scratch). Shared
/// fields come from the first row seen for each carrier. Rows with a
/// blank `unit_type` contribute their shared fields but no cell.
///
/// Always returns at least one (possibly all-blank) group so the
/// matrix editor has a row to type into.
pub fn to_pivoted(rows: &[ChargeRow]) -> Vec<PivotedRow> {
    let mut groups: Vec<PivotedRow> = Vec::new();

    for row in rows {
        let index = match groups.iter().position(|g| g.carrier == row.carrier) {
            Some(i) => i,
            None => {
                groups.push(PivotedRow::from_first_row(row));
                groups.len() - 1
            }
        };
        if !row.unit_type.is_empty() {
            groups[index]
                .breaks
                .insert(row.unit_type.clone(), row.amount.clone());
        }
    }

    if groups.is_empty() {
        groups.push(PivotedRow::default());
    }
    groups
}

/// Matrix -> flat rows.
///
/// Emits exactly one row per group per standard weight break, in
/// [`WEIGHT_BREAKS`] order, with a blank amount for absent cells and
/// the group's shared fields duplicated onto every row. Row totals are
/// recomputed (a pivoted cell has no unit count, so a fresh row totals
/// zero until units are entered).
pub fn to_rows(pivoted: &[PivotedRow]) -> Vec<ChargeRow> {
    let mut rows = Vec::with_capacity(pivoted.len() * WEIGHT_BREAKS.len());
    for group in pivoted {
        for label in WEIGHT_BREAKS {
            let mut row = ChargeRow::empty();
            row.carrier = group.carrier.clone();
            row.unit_type = label.to_string();
            row.amount = group.breaks.get(label).cloned().unwrap_or_default();
            row.currency = group.currency.clone();
            row.transit_time = group.transit_time.clone();
            row.number_of_routing = group.number_of_routing.clone();
            row.surcharge = group.surcharge.clone();
            row.frequency = group.frequency.clone();
            row.remarks = group.remarks.clone();
            row.total = row_total(&row, ChargeBasis::PerUnit);
            rows.push(row);
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate_row(carrier: &str, unit_type: &str, amount: &str) -> ChargeRow {
        let mut row = ChargeRow::empty();
        row.carrier = carrier.to_string();
        row.unit_type = unit_type.to_string();
        row.amount = amount.to_string();
        row.currency = "USD".to_string();
        row.transit_time = "2".to_string();
        row
    }

    #[test]
    fn test_groups_by_carrier_in_encounter_order() {
        let rows = vec![
            rate_row("EK", "+45kg", "4.10"),
            rate_row("CX", "+45kg", "4.50"),
            rate_row("EK", "+100kg", "3.80"),
        ];
        let pivoted = to_pivoted(&rows);
        assert_eq!(pivoted.len(), 2);
        assert_eq!(pivoted[0].carrier, "EK");
        assert_eq!(pivoted[1].carrier, "CX");
        assert_eq!(pivoted[0].breaks.get("+100kg").unwrap(), "3.80");
    }

    #[test]
    fn test_shared_fields_from_first_row() {
        let mut first = rate_row("EK", "+45kg", "4.10");
        first.remarks = "direct flight".to_string();
        let mut second = rate_row("EK", "+100kg", "3.80");
        second.remarks = "ignored".to_string();

        let pivoted = to_pivoted(&[first, second]);
        assert_eq!(pivoted[0].remarks, "direct flight");
        assert_eq!(pivoted[0].currency, "USD");
    }

    #[test]
    fn test_empty_carrier_is_a_valid_group() {
        let rows = vec![rate_row("", "+45kg", "5.00")];
        let pivoted = to_pivoted(&rows);
        assert_eq!(pivoted.len(), 1);
        assert_eq!(pivoted[0].carrier, "");
        assert_eq!(pivoted[0].breaks.get("+45kg").unwrap(), "5.00");
    }

    #[test]
    fn test_empty_input_yields_one_blank_group() {
        let pivoted = to_pivoted(&[]);
        assert_eq!(pivoted.len(), 1);
        assert!(pivoted[0].breaks.is_empty());
        assert_eq!(pivoted[0].carrier, "");
    }

    #[test]
    fn test_blank_unit_type_contributes_no_cell() {
        let rows = vec![rate_row("EK", "", "4.10")];
        let pivoted = to_pivoted(&rows);
        assert_eq!(pivoted.len(), 1);
        assert!(pivoted[0].breaks.is_empty());
    }

    #[test]
    fn test_to_rows_emits_all_six_breaks_in_order() {
        let pivoted = to_pivoted(&[rate_row("EK", "+300kg", "3.10")]);
        let rows = to_rows(&pivoted);
        assert_eq!(rows.len(), 6);
        let labels: Vec<&str> = rows.iter().map(|r| r.unit_type.as_str()).collect();
        assert_eq!(labels, WEIGHT_BREAKS.to_vec());
        assert_eq!(rows[3].amount, "3.10");
        assert_eq!(rows[0].amount, "");
        // shared fields duplicated on every emitted row
        assert!(rows.iter().all(|r| r.currency == "USD"));
    }

    #[test]
    fn test_round_trip_is_fixed_point_for_standard_labels() {
        let source = vec![
            rate_row("EK", "-45kg", "6.00"),
            rate_row("EK", "+45kg", "4.10"),
            rate_row("EK", "+100kg", "3.80"),
            rate_row("EK", "+300kg", "3.10"),
            rate_row("EK", "+500kg", "2.90"),
            rate_row("EK", "+1000kg", "2.70"),
        ];
        let once = to_rows(&to_pivoted(&source));
        let twice = to_rows(&to_pivoted(&once));
        assert_eq!(once, twice);
        assert_eq!(once.len(), 6);
        for (row, original) in once.iter().zip(source.iter()) {
            assert_eq!(row.unit_type, original.unit_type);
            assert_eq!(row.amount, original.amount);
        }
    }

    #[test]
    fn test_non_standard_label_is_dropped_by_round_trip() {
        let rows = vec![
            rate_row("EK", "+45kg", "4.10"),
            rate_row("EK", "+2000kg", "2.50"), // not a standard bracket
        ];
        let round = to_rows(&to_pivoted(&rows));
        assert_eq!(round.len(), 6);
        assert!(round.iter().all(|r| r.unit_type != "+2000kg"));
        assert!(round.iter().any(|r| r.unit_type == "+45kg" && r.amount == "4.10"));
    }
}
