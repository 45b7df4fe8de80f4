//! # Charge Calculator
//!
//! Row-level and table-level total arithmetic. Every operation here is
//! a pure function over an immutable snapshot: callers get a new
//! `ChargeTable` back and are responsible for swapping it into the
//! document (the assembler does exactly that).
//!
//! Two rules are load-bearing and must not drift:
//!
//! 1. `total` is recomputed inside the same update that changed a
//!    value field. There is no separate "recalculate" step a caller
//!    could forget, and stored totals are never trusted.
//! 2. [`document_total`] sums destination + origin-handling +
//!    destination-handling charges only. Freight tables are excluded
//!    from the grand total for every quote type; freight pricing is
//!    presented per carrier, not aggregated.
//!
//! ## Example
//!
//! ```rust
//! use quote_core::charges::{update_row, table_total, ChargeField};
//! use quote_core::document::{ChargeBasis, ChargeTable};
//!
//! let table = ChargeTable::with_name("Destination Charges", ChargeBasis::PerUnit);
//! let table = update_row(&table, 0, ChargeField::NumberOfUnits, "3");
//! let table = update_row(&table, 0, ChargeField::Amount, "120");
//! assert_eq!(table.charges[0].total, 360.0);
//! assert_eq!(table_total(&table), 360.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::document::{
    parse_amount, ChargeBasis, ChargeRow, ChargeTable, Quote, QuoteOptions,
};

/// Editable fields of a [`ChargeRow`], used by [`update_row`].
///
/// A typed selector instead of a field-name string: the compiler keeps
/// edit sites and the recompute rule in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChargeField {
    Carrier,
    ChargeName,
    UnitType,
    NumberOfUnits,
    Amount,
    Currency,
    TransitTime,
    NumberOfRouting,
    Surcharge,
    Frequency,
    Remarks,
    ChargeableWeight,
    WeightBreaker,
    Charge,
}

impl ChargeField {
    /// Does editing this field change the row total?
    fn affects_total(&self) -> bool {
        matches!(
            self,
            ChargeField::NumberOfUnits
                | ChargeField::Amount
                | ChargeField::ChargeableWeight
                | ChargeField::Charge
        )
    }
}

/// Context for pre-filling new rows.
///
/// When a table is scoped to a single known carrier (a direct quote
/// option), new rows inherit that carrier so the rate matrix stays
/// consistent without retyping.
#[derive(Debug, Clone, Default)]
pub struct RowContext {
    pub carrier: String,
    pub charge_name: String,
}

impl RowContext {
    pub fn for_carrier(carrier: impl Into<String>) -> Self {
        RowContext {
            carrier: carrier.into(),
            charge_name: String::new(),
        }
    }
}

/// Compute one row's total from its entry fields.
///
/// Blank or unparseable values count as zero, so an untouched row
/// totals `0.0` rather than poisoning the table sum.
pub fn row_total(row: &ChargeRow, basis: ChargeBasis) -> f64 {
    match basis {
        ChargeBasis::PerUnit => parse_amount(&row.number_of_units) * parse_amount(&row.amount),
        ChargeBasis::PerWeight => parse_amount(&row.chargeable_weight) * parse_amount(&row.charge),
    }
}

/// Append a zero-valued row, pre-filled from `context`.
pub fn add_row(table: &ChargeTable, context: &RowContext) -> ChargeTable {
    let mut next = table.clone();
    let mut row = ChargeRow::empty();
    row.carrier = context.carrier.clone();
    row.charge_name = context.charge_name.clone();
    next.charges.push(row);
    next
}

/// Remove the row at `index`.
///
/// A single-row table is left unchanged (tables are never empty), as
/// is a table when `index` is out of range. Neither case is an error;
/// the document can never be left invalid by one operation.
pub fn remove_row(table: &ChargeTable, index: usize) -> ChargeTable {
    if table.charges.len() <= 1 || index >= table.charges.len() {
        return table.clone();
    }
    let mut next = table.clone();
    next.charges.remove(index);
    next
}

/// Set one field on the row at `index`, recomputing the row total in
/// the same step when a value field changed.
///
/// Out-of-range indexes are a no-op clone.
pub fn update_row(table: &ChargeTable, index: usize, field: ChargeField, value: &str) -> ChargeTable {
    if index >= table.charges.len() {
        return table.clone();
    }
    let mut next = table.clone();
    let row = &mut next.charges[index];

    let value = value.to_string();
    match field {
        ChargeField::Carrier => row.carrier = value,
        ChargeField::ChargeName => row.charge_name = value,
        ChargeField::UnitType => row.unit_type = value,
        ChargeField::NumberOfUnits => row.number_of_units = value,
        ChargeField::Amount => row.amount = value,
        ChargeField::Currency => row.currency = value,
        ChargeField::TransitTime => row.transit_time = value,
        ChargeField::NumberOfRouting => row.number_of_routing = value,
        ChargeField::Surcharge => row.surcharge = value,
        ChargeField::Frequency => row.frequency = value,
        ChargeField::Remarks => row.remarks = value,
        ChargeField::ChargeableWeight => row.chargeable_weight = value,
        ChargeField::WeightBreaker => row.weight_breaker = value,
        ChargeField::Charge => row.charge = value,
    }

    if field.affects_total() {
        let basis = next.basis;
        let row = &mut next.charges[index];
        row.total = row_total(row, basis);
    }
    next
}

/// Sum of all row totals in a table, always recomputed from the entry
/// fields.
pub fn table_total(table: &ChargeTable) -> f64 {
    table
        .charges
        .iter()
        .map(|row| row_total(row, table.basis))
        .sum()
}

/// Sum of a collection of tables.
pub fn collection_total(tables: &[ChargeTable]) -> f64 {
    tables.iter().map(table_total).sum()
}

/// The quote's grand total: destination + origin-handling +
/// destination-handling charges across every carrier option or route
/// segment. Freight tables are always excluded, for every quote type.
pub fn document_total(quote: &Quote) -> f64 {
    quote
        .options
        .charge_sets()
        .iter()
        .map(|set| {
            collection_total(&set.destination)
                + collection_total(&set.origin_handling)
                + collection_total(&set.destination_handling)
        })
        .sum()
}

/// Recompute every stored row total in place and return the new
/// snapshot. Used at the migration and render boundaries so stored
/// totals never leak through.
pub fn recompute_totals(quote: &Quote) -> Quote {
    let mut next = quote.clone();
    let fix = |tables: &mut Vec<ChargeTable>| {
        for table in tables.iter_mut() {
            let basis = table.basis;
            for row in table.charges.iter_mut() {
                row.total = row_total(row, basis);
            }
        }
    };
    match &mut next.options {
        QuoteOptions::Carriers(carriers) => {
            for option in carriers.iter_mut() {
                fix(&mut option.charges.freight);
                fix(&mut option.charges.destination);
                fix(&mut option.charges.origin_handling);
                fix(&mut option.charges.destination_handling);
            }
        }
        QuoteOptions::Routes(routes) => {
            for route in routes.iter_mut() {
                for segment in route.segments.iter_mut() {
                    fix(&mut segment.charges.freight);
                    fix(&mut segment.charges.destination);
                    fix(&mut segment.charges.origin_handling);
                    fix(&mut segment.charges.destination_handling);
                }
            }
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{CarrierOption, FreightType};

    fn unit_table() -> ChargeTable {
        ChargeTable::with_name("test", ChargeBasis::PerUnit)
    }

    #[test]
    fn test_update_row_recomputes_total() {
        let table = unit_table();
        let table = update_row(&table, 0, ChargeField::NumberOfUnits, "3");
        let table = update_row(&table, 0, ChargeField::Amount, "120");
        assert_eq!(table.charges[0].total, 360.0);
    }

    #[test]
    fn test_update_non_value_field_keeps_total() {
        let table = unit_table();
        let table = update_row(&table, 0, ChargeField::NumberOfUnits, "2");
        let table = update_row(&table, 0, ChargeField::Amount, "50");
        let table = update_row(&table, 0, ChargeField::Remarks, "per house bill");
        assert_eq!(table.charges[0].total, 100.0);
        assert_eq!(table.charges[0].remarks, "per house bill");
    }

    #[test]
    fn test_weight_basis_total() {
        let mut table = unit_table();
        table.basis = ChargeBasis::PerWeight;
        let table = update_row(&table, 0, ChargeField::ChargeableWeight, "500");
        let table = update_row(&table, 0, ChargeField::Charge, "1.2");
        assert_eq!(table.charges[0].total, 600.0);
    }

    #[test]
    fn test_add_row_prefills_carrier() {
        let table = unit_table();
        let table = add_row(&table, &RowContext::for_carrier("Maersk"));
        assert_eq!(table.charges.len(), 2);
        assert_eq!(table.charges[1].carrier, "Maersk");
        assert_eq!(table.charges[1].total, 0.0);
    }

    #[test]
    fn test_remove_last_row_is_noop() {
        let table = unit_table();
        let after = remove_row(&table, 0);
        assert_eq!(after, table);
        // and again - idempotent
        let again = remove_row(&after, 0);
        assert_eq!(again, table);
    }

    #[test]
    fn test_remove_row_out_of_range_is_noop() {
        let table = add_row(&unit_table(), &RowContext::default());
        let after = remove_row(&table, 7);
        assert_eq!(after, table);
    }

    #[test]
    fn test_update_row_out_of_range_is_noop() {
        let table = unit_table();
        let after = update_row(&table, 5, ChargeField::Amount, "99");
        assert_eq!(after, table);
    }

    #[test]
    fn test_blank_values_total_zero() {
        let table = update_row(&unit_table(), 0, ChargeField::Amount, "100");
        // number_of_units still blank
        assert_eq!(table.charges[0].total, 0.0);
        assert_eq!(table_total(&table), 0.0);
    }

    #[test]
    fn test_document_total_excludes_freight() {
        // Spec scenario: two 360 rows in destination, one identical row
        // in freight -> grand total 720.
        let mut quote = Quote::new(FreightType::Direct);
        let QuoteOptions::Carriers(ref mut carriers) = quote.options else {
            panic!("direct quote");
        };
        let option: &mut CarrierOption = &mut carriers[0];

        let dest = &option.charges.destination[0];
        let dest = update_row(dest, 0, ChargeField::NumberOfUnits, "3");
        let dest = update_row(&dest, 0, ChargeField::Amount, "120");
        let dest = add_row(&dest, &RowContext::default());
        let dest = update_row(&dest, 1, ChargeField::NumberOfUnits, "3");
        let dest = update_row(&dest, 1, ChargeField::Amount, "120");
        option.charges.destination[0] = dest;

        let freight = &option.charges.freight[0];
        let freight = update_row(freight, 0, ChargeField::NumberOfUnits, "3");
        let freight = update_row(&freight, 0, ChargeField::Amount, "120");
        option.charges.freight[0] = freight;

        assert_eq!(document_total(&quote), 720.0);
    }

    #[test]
    fn test_document_total_over_segments() {
        let mut quote = Quote::new(FreightType::Transit);
        let QuoteOptions::Routes(ref mut routes) = quote.options else {
            panic!("transit quote");
        };
        let segment = &mut routes[0].segments[0];
        let table = update_row(
            &segment.charges.origin_handling[0],
            0,
            ChargeField::NumberOfUnits,
            "2",
        );
        let table = update_row(&table, 0, ChargeField::Amount, "45");
        segment.charges.origin_handling[0] = table;

        assert_eq!(document_total(&quote), 90.0);
    }

    #[test]
    fn test_recompute_totals_overrides_stored() {
        let mut quote = Quote::new(FreightType::Direct);
        let QuoteOptions::Carriers(ref mut carriers) = quote.options else {
            panic!("direct quote");
        };
        let row = &mut carriers[0].charges.destination[0].charges[0];
        row.number_of_units = "4".to_string();
        row.amount = "25".to_string();
        row.total = 999.0; // stale stored value

        let fixed = recompute_totals(&quote);
        let QuoteOptions::Carriers(carriers) = &fixed.options else {
            panic!("direct quote");
        };
        assert_eq!(carriers[0].charges.destination[0].charges[0].total, 100.0);
    }
}
