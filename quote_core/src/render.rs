//! # Render Projection
//!
//! Flattens a quote into the ordered report blocks the PDF renderer
//! consumes: per option/segment and per charge section, one block of
//! (title, header row, data rows, footer total), followed by a summary
//! block. The PDF renderer itself is an external collaborator; this
//! module only decides *what* gets printed, including page-break
//! assignment in abstract height units.
//!
//! The PDF path historically received raw persisted records that never
//! went through migration, so [`project_record`] accepts one and
//! normalizes it at this boundary before projecting.
//!
//! Display rules reproduced here:
//!
//! - money cells print `"{currency} {amount}"` when both are present,
//!   otherwise the bare non-empty value
//! - totals print rounded to whole units on the PDF (on-screen editing
//!   keeps full precision)
//! - remark text is re-wrapped: a break before every `NN. ` numbered
//!   marker, long lines additionally broken at sentence ends, runs of
//!   blank lines collapsed
//! - a missing section projects to an empty row list; callers omit the
//!   block rather than treating it as a failure

use serde::{Deserialize, Serialize};

use crate::charges::{document_total, table_total};
use crate::document::{
    parse_amount, ChargeRow, ChargeSection, ChargeSet, ChargeTable, FreightCategory, Quote,
    QuoteOptions, WEIGHT_BREAKS,
};
use crate::migrate::{charge_rows_from, load_quote_record, RawRecord};
use crate::pivot::to_pivoted;

/// One printable block of the quote report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportBlock {
    pub title: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Formatted block total; empty for blocks without one
    pub footer_total: String,
}

impl ReportBlock {
    /// Estimated height in abstract units: title + header + footer
    /// plus one unit per data row. The page-break model only compares
    /// these against a page capacity, so the unit is arbitrary.
    pub fn estimated_height(&self) -> f64 {
        3.0 + self.rows.len() as f64
    }
}

/// `"{currency} {amount}"` when both are present, else the bare
/// non-empty value, else blank.
pub fn format_money(currency: &str, amount: &str) -> String {
    match (currency.is_empty(), amount.is_empty()) {
        (false, false) => format!("{} {}", currency, amount),
        (false, true) => currency.to_string(),
        (true, false) => amount.to_string(),
        (true, true) => String::new(),
    }
}

/// Totals are printed as whole units on the PDF.
pub fn format_total(total: f64) -> String {
    format!("{}", total.round() as i64)
}

/// Blank-tolerant display: `"N/A"` for a missing value.
pub fn display_or_na(value: &str) -> String {
    if value.trim().is_empty() {
        "N/A".to_string()
    } else {
        value.to_string()
    }
}

/// Re-wrap remark text for the PDF remarks column.
///
/// 1. a line break is inserted before every `NN. ` numbered marker
///    (two digits, a dot, a space)
/// 2. any resulting line longer than 60 characters is additionally
///    broken after each sentence-ending `. ` that is followed by a
///    non-digit (so `no. 2` and decimal references stay intact)
/// 3. runs of three or more breaks collapse to two
pub fn wrap_remarks(text: &str) -> String {
    let marked = break_before_markers(text);

    let mut out = String::with_capacity(marked.len());
    for (i, line) in marked.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        if line.chars().count() > 60 {
            out.push_str(&break_after_sentences(line));
        } else {
            out.push_str(line);
        }
    }

    collapse_breaks(&out)
}

fn break_before_markers(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    for (i, &c) in chars.iter().enumerate() {
        let starts_marker = c.is_ascii_digit()
            && chars.get(i + 1).is_some_and(|c| c.is_ascii_digit())
            && chars.get(i + 2) == Some(&'.')
            && chars.get(i + 3) == Some(&' ')
            // exactly two digits: not preceded by another digit
            && (i == 0 || !chars[i - 1].is_ascii_digit());
        if starts_marker && i > 0 && chars[i - 1] != '\n' {
            out.push('\n');
        }
        out.push(c);
    }
    out
}

fn break_after_sentences(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    let mut i = 0;
    while i < chars.len() {
        out.push(chars[i]);
        if chars[i] == '.'
            && chars.get(i + 1) == Some(&' ')
            && chars.get(i + 2).is_some_and(|c| !c.is_ascii_digit())
        {
            out.push('\n');
            i += 2; // the space is consumed by the break
            continue;
        }
        i += 1;
    }
    out
}

fn collapse_breaks(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run = 0;
    for c in text.chars() {
        if c == '\n' {
            run += 1;
            if run <= 2 {
                out.push(c);
            }
        } else {
            run = 0;
            out.push(c);
        }
    }
    out
}

/// Flatten one section's tables into plain rows.
///
/// An absent or unrecognizable section is an empty list, never an
/// error; callers omit the block.
pub fn section_rows(value: &serde_json::Value) -> Vec<ChargeRow> {
    charge_rows_from(value)
}

/// Row total as the PDF computes it: always from the entry fields,
/// weight-based when weight fields are present.
fn projected_row_total(row: &ChargeRow) -> f64 {
    if !row.chargeable_weight.is_empty() || !row.charge.is_empty() {
        parse_amount(&row.chargeable_weight) * parse_amount(&row.charge)
    } else {
        parse_amount(&row.number_of_units) * parse_amount(&row.amount)
    }
}

fn row_cells(row: &ChargeRow) -> Vec<String> {
    let label = if !row.charge_name.is_empty() {
        row.charge_name.clone()
    } else if !row.carrier.is_empty() {
        row.carrier.clone()
    } else {
        row.weight_breaker.clone()
    };
    let unit = if !row.unit_type.is_empty() {
        row.unit_type.clone()
    } else {
        row.chargeable_weight.clone()
    };
    let rate = if !row.charge.is_empty() {
        format_money(&row.currency, &row.charge)
    } else {
        format_money(&row.currency, &row.amount)
    };
    vec![
        label,
        unit,
        row.number_of_units.clone(),
        rate,
        format_total(projected_row_total(row)),
    ]
}

fn row_block(title: String, tables: &[ChargeTable]) -> ReportBlock {
    let rows: Vec<Vec<String>> = tables
        .iter()
        .flat_map(|table| table.charges.iter())
        .filter(|row| {
            // skip untouched blank rows, keep anything with content
            !(row.charge_name.is_empty()
                && row.carrier.is_empty()
                && row.amount.is_empty()
                && row.charge.is_empty()
                && row.weight_breaker.is_empty())
        })
        .map(row_cells)
        .collect();
    let total: f64 = tables.iter().map(table_total).sum();
    ReportBlock {
        title,
        header: ["Description", "Unit", "Qty", "Rate", "Total"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        rows,
        footer_total: format_total(total),
    }
}

/// Air-freight rate matrix block: one row per carrier, one column per
/// standard weight break.
fn pivot_block(title: String, tables: &[ChargeTable]) -> ReportBlock {
    let flat: Vec<ChargeRow> = tables
        .iter()
        .flat_map(|table| table.charges.iter().cloned())
        .collect();
    let rows: Vec<Vec<String>> = to_pivoted(&flat)
        .iter()
        .filter(|group| !group.carrier.is_empty() || !group.breaks.is_empty())
        .map(|group| {
            let mut cells = vec![group.carrier.clone()];
            for label in WEIGHT_BREAKS {
                cells.push(group.breaks.get(label).cloned().unwrap_or_default());
            }
            cells.push(group.transit_time.clone());
            cells.push(group.frequency.clone());
            cells.push(wrap_remarks(&group.remarks));
            cells
        })
        .collect();

    let mut header = vec!["Carrier".to_string()];
    header.extend(WEIGHT_BREAKS.iter().map(|s| s.to_string()));
    header.push("T/T".to_string());
    header.push("Frequency".to_string());
    header.push("Remarks".to_string());

    ReportBlock {
        title,
        header,
        rows,
        // freight matrices print rates, not a sum
        footer_total: String::new(),
    }
}

fn section_block(
    quote: &Quote,
    label: &str,
    set: &ChargeSet,
    section: ChargeSection,
) -> ReportBlock {
    let title = format!("{} - {}", section.title(), label);
    let tables = set.section(section);
    if section == ChargeSection::Freight && quote.freight_category == FreightCategory::Air {
        pivot_block(title, tables)
    } else {
        row_block(title, tables)
    }
}

/// The quote-details block that opens every report.
fn details_block(quote: &Quote) -> ReportBlock {
    let validity = match (quote.meta.validity_from, quote.meta.validity_to) {
        (Some(from), Some(to)) => format!("{} to {}", from, to),
        (Some(from), None) => format!("from {}", from),
        (None, Some(to)) => format!("until {}", to),
        (None, None) => "N/A".to_string(),
    };
    ReportBlock {
        title: format!("Quotation {}", display_or_na(&quote.meta.quote_number)),
        header: Vec::new(),
        rows: vec![
            vec!["Customer".to_string(), display_or_na(&quote.meta.customer)],
            vec!["Origin".to_string(), display_or_na(&quote.meta.origin)],
            vec![
                "Destination".to_string(),
                display_or_na(&quote.meta.destination),
            ],
            vec!["Validity".to_string(), validity],
        ],
        footer_total: String::new(),
    }
}

/// Project a canonical quote into ordered report blocks.
///
/// Blocks with no data rows are dropped (an absent section means
/// "omit this block"), except the details and summary blocks which
/// always print.
pub fn project_quote(quote: &Quote) -> Vec<ReportBlock> {
    let mut blocks = vec![details_block(quote)];

    match &quote.options {
        QuoteOptions::Carriers(carriers) => {
            for (i, option) in carriers.iter().enumerate() {
                let label = if option.carrier.is_empty() {
                    format!("Option {}", i + 1)
                } else {
                    option.carrier.clone()
                };
                for section in ChargeSection::all() {
                    let block = section_block(quote, &label, &option.charges, section);
                    if !block.rows.is_empty() {
                        blocks.push(block);
                    }
                }
            }
        }
        QuoteOptions::Routes(routes) => {
            for (i, route) in routes.iter().enumerate() {
                let route_label = if route.route_name.is_empty() {
                    format!("Route {}", i + 1)
                } else {
                    route.route_name.clone()
                };
                for (j, segment) in route.segments.iter().enumerate() {
                    let label = if segment.origin.is_empty() && segment.destination.is_empty() {
                        format!("{}, Leg {}", route_label, j + 1)
                    } else {
                        format!("{}, {} to {}", route_label, segment.origin, segment.destination)
                    };
                    for section in ChargeSection::all() {
                        let block = section_block(quote, &label, &segment.charges, section);
                        if !block.rows.is_empty() {
                            blocks.push(block);
                        }
                    }
                }
            }
        }
    }

    blocks.push(ReportBlock {
        title: "Summary".to_string(),
        header: Vec::new(),
        rows: vec![vec![
            "Total charges (freight excluded)".to_string(),
            format_total(document_total(quote)),
        ]],
        footer_total: format_total(document_total(quote)),
    });

    blocks
}

/// Project a raw, unmigrated persisted record.
///
/// The legacy PDF export read records straight from the store, so this
/// entry point accepts all three historical shapes; it normalizes
/// through the migrator once and projects the canonical result.
pub fn project_record(record: &RawRecord) -> Vec<ReportBlock> {
    project_quote(&load_quote_record(record))
}

/// Assign blocks to pages.
///
/// A block whose estimated height exceeds the space remaining on the
/// current page starts a new page; a block taller than a whole page
/// gets a page of its own. `capacity` is in the same abstract units as
/// [`ReportBlock::estimated_height`].
pub fn paginate(blocks: &[ReportBlock], capacity: f64) -> Vec<Vec<ReportBlock>> {
    let mut pages: Vec<Vec<ReportBlock>> = Vec::new();
    let mut current: Vec<ReportBlock> = Vec::new();
    let mut used = 0.0;

    for block in blocks {
        let height = block.estimated_height();
        if !current.is_empty() && used + height > capacity {
            pages.push(std::mem::take(&mut current));
            used = 0.0;
        }
        current.push(block.clone());
        used += height;
    }
    if !current.is_empty() {
        pages.push(current);
    }
    pages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charges::{update_row, ChargeField};
    use crate::document::FreightType;
    use serde_json::json;

    #[test]
    fn test_format_money() {
        assert_eq!(format_money("USD", "120"), "USD 120");
        assert_eq!(format_money("", "120"), "120");
        assert_eq!(format_money("USD", ""), "USD");
        assert_eq!(format_money("", ""), "");
    }

    #[test]
    fn test_format_total_rounds_to_integer() {
        assert_eq!(format_total(359.6), "360");
        assert_eq!(format_total(360.4), "360");
        assert_eq!(format_total(0.0), "0");
    }

    #[test]
    fn test_display_or_na() {
        assert_eq!(display_or_na(""), "N/A");
        assert_eq!(display_or_na("  "), "N/A");
        assert_eq!(display_or_na("Acme"), "Acme");
    }

    #[test]
    fn test_wrap_remarks_numbered_markers() {
        let text = "01. Rates exclude duty. 02. Subject to space.";
        let wrapped = wrap_remarks(text);
        assert_eq!(wrapped, "01. Rates exclude duty. \n02. Subject to space.");
    }

    #[test]
    fn test_wrap_remarks_marker_at_start_gets_no_leading_break() {
        let wrapped = wrap_remarks("01. First item");
        assert_eq!(wrapped, "01. First item");
    }

    #[test]
    fn test_wrap_remarks_long_line_breaks_at_sentence() {
        let text = "This quotation is valid only for the named account holder. Rates are subject to carrier confirmation at time of booking.";
        let wrapped = wrap_remarks(text);
        assert!(wrapped.contains("named account holder.\nRates"));
    }

    #[test]
    fn test_wrap_remarks_sentence_break_skips_digits() {
        // ". 2" must not break: decimal and item references stay intact
        let text = "See clause no. 2 for the demurrage terms applying to all shipments above.";
        let wrapped = wrap_remarks(text);
        assert!(!wrapped.contains("no.\n2"));
    }

    #[test]
    fn test_wrap_remarks_short_line_untouched() {
        let text = "Valid 30 days. All in.";
        assert_eq!(wrap_remarks(text), text);
    }

    #[test]
    fn test_wrap_remarks_collapses_break_runs() {
        let wrapped = wrap_remarks("a\n\n\n\nb");
        assert_eq!(wrapped, "a\n\nb");
    }

    #[test]
    fn test_section_rows_absent_is_empty() {
        assert!(section_rows(&json!(null)).is_empty());
        assert!(section_rows(&json!({})).is_empty());
    }

    #[test]
    fn test_project_direct_quote_blocks() {
        let mut quote = Quote::new(FreightType::Direct);
        quote.freight_category = FreightCategory::Sea;
        quote.meta.quote_number = "FQ-1".to_string();
        let QuoteOptions::Carriers(ref mut carriers) = quote.options else {
            panic!("direct quote");
        };
        carriers[0].carrier = "Maersk".to_string();
        let dest = update_row(
            &carriers[0].charges.destination[0],
            0,
            ChargeField::ChargeName,
            "THC",
        );
        let dest = update_row(&dest, 0, ChargeField::NumberOfUnits, "2");
        let dest = update_row(&dest, 0, ChargeField::Amount, "85");
        let dest = update_row(&dest, 0, ChargeField::Currency, "USD");
        carriers[0].charges.destination[0] = dest;

        let blocks = project_quote(&quote);
        // details + destination + summary (blank sections omitted)
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].title, "Quotation FQ-1");
        assert_eq!(blocks[1].title, "Destination Charges - Maersk");
        assert_eq!(blocks[1].rows[0], vec!["THC", "", "2", "USD 85", "170"]);
        assert_eq!(blocks[1].footer_total, "170");
        assert_eq!(blocks[2].title, "Summary");
        assert_eq!(blocks[2].footer_total, "170");
    }

    #[test]
    fn test_project_air_freight_as_pivot_matrix() {
        let mut quote = Quote::new(FreightType::Direct);
        quote.freight_category = FreightCategory::Air;
        let QuoteOptions::Carriers(ref mut carriers) = quote.options else {
            panic!("direct quote");
        };
        let freight = &carriers[0].charges.freight[0];
        let freight = update_row(freight, 0, ChargeField::Carrier, "EK");
        let freight = update_row(&freight, 0, ChargeField::UnitType, "+100kg");
        let freight = update_row(&freight, 0, ChargeField::Amount, "3.80");
        carriers[0].charges.freight[0] = freight;

        let blocks = project_quote(&quote);
        let matrix = blocks
            .iter()
            .find(|b| b.title.starts_with("Freight Charges"))
            .expect("freight matrix block");
        assert_eq!(matrix.header[0], "Carrier");
        assert_eq!(matrix.header[1..7], WEIGHT_BREAKS.map(String::from));
        assert_eq!(matrix.rows.len(), 1);
        assert_eq!(matrix.rows[0][0], "EK");
        assert_eq!(matrix.rows[0][3], "3.80"); // +100kg column
        assert_eq!(matrix.rows[0][1], ""); // -45kg blank
    }

    #[test]
    fn test_project_record_tolerates_legacy_shape() {
        let record = json!({
            "freightType": "direct",
            "freightCategory": "sea",
            "carriers": "[{\"carrier\":\"A\"},{\"carrier\":\"B\"}]",
            "destinationCharges": "[{\"chargeName\":\"THC\",\"numberOfUnits\":\"1\",\"amount\":\"60\"}]"
        })
        .as_object()
        .unwrap()
        .clone();

        let blocks = project_record(&record);
        let dest: Vec<_> = blocks
            .iter()
            .filter(|b| b.title.starts_with("Destination Charges"))
            .collect();
        // legacy-v1 duplicates the shared section across both carriers
        assert_eq!(dest.len(), 2);
        assert_eq!(dest[0].footer_total, "60");
        let summary = blocks.last().unwrap();
        assert_eq!(summary.footer_total, "120");
    }

    #[test]
    fn test_paginate_breaks_on_capacity() {
        let block = |rows: usize| ReportBlock {
            title: "t".to_string(),
            header: Vec::new(),
            rows: vec![Vec::new(); rows],
            footer_total: String::new(),
        };
        // heights: 7, 7, 4 with capacity 10 -> pages [1], [1], [1]? no:
        // 7 + 7 > 10 so second block opens page 2; 7 + 4 > 10 so the
        // third opens page 3
        let blocks = vec![block(4), block(4), block(1)];
        let pages = paginate(&blocks, 10.0);
        assert_eq!(pages.len(), 3);

        // everything fits on one page
        let pages = paginate(&blocks, 100.0);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].len(), 3);

        // oversized block still gets placed, alone
        let pages = paginate(&[block(50)], 10.0);
        assert_eq!(pages.len(), 1);
    }

    #[test]
    fn test_paginate_empty_input() {
        assert!(paginate(&[], 10.0).is_empty());
    }
}
