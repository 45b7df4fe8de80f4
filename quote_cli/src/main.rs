//! # Freightdesk CLI
//!
//! Terminal front end for the quote document engine: load a `.fqd`
//! file (canonical or legacy record), print its charge blocks and
//! totals, or run a built-in demo quote when no path is given.

use std::env;
use std::path::Path;
use std::process::ExitCode;

use quote_core::assembler::total_transit_time;
use quote_core::charges::{document_total, update_row, ChargeField};
use quote_core::document::{FreightCategory, FreightType, Quote, QuoteOptions};
use quote_core::file_io::load_quote;
use quote_core::render::{paginate, project_quote};

/// Abstract page capacity used for the pagination preview
const PAGE_CAPACITY: f64 = 40.0;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    let quote = match args.get(1) {
        Some(path) => match load_quote(Path::new(path)) {
            Ok(quote) => quote,
            Err(e) => {
                eprintln!("Error: {}", e);
                if let Ok(json) = serde_json::to_string_pretty(&e) {
                    eprintln!();
                    eprintln!("Error JSON:");
                    eprintln!("{}", json);
                }
                return ExitCode::FAILURE;
            }
        },
        None => {
            println!("No quote file given. Showing demo quote...");
            println!();
            demo_quote()
        }
    };

    print_quote(&quote);
    ExitCode::SUCCESS
}

/// A small direct air quote with one rated carrier, for demos.
fn demo_quote() -> Quote {
    let mut quote = Quote::new(FreightType::Direct);
    quote.freight_category = FreightCategory::Air;
    quote.meta.quote_number = "FQ-DEMO-001".to_string();
    quote.meta.customer = "Demo Customer".to_string();
    quote.meta.origin = "HKG".to_string();
    quote.meta.destination = "DXB".to_string();

    if let QuoteOptions::Carriers(ref mut carriers) = quote.options {
        let freight = &carriers[0].charges.freight[0];
        let freight = update_row(freight, 0, ChargeField::Carrier, "EK");
        let freight = update_row(&freight, 0, ChargeField::UnitType, "+100kg");
        let freight = update_row(&freight, 0, ChargeField::Amount, "3.80");
        let freight = update_row(&freight, 0, ChargeField::Currency, "USD");
        carriers[0].charges.freight[0] = freight;

        let dest = &carriers[0].charges.destination[0];
        let dest = update_row(dest, 0, ChargeField::ChargeName, "Airport transfer");
        let dest = update_row(&dest, 0, ChargeField::NumberOfUnits, "1");
        let dest = update_row(&dest, 0, ChargeField::Amount, "150");
        let dest = update_row(&dest, 0, ChargeField::Currency, "USD");
        carriers[0].charges.destination[0] = dest;
    }
    quote
}

fn print_quote(quote: &Quote) {
    let blocks = project_quote(quote);
    let pages = paginate(&blocks, PAGE_CAPACITY);

    println!("=======================================");
    println!("  FREIGHT QUOTE");
    println!("=======================================");

    for (page_number, page) in pages.iter().enumerate() {
        if pages.len() > 1 {
            println!();
            println!("--- page {} of {} ---", page_number + 1, pages.len());
        }
        for block in page {
            println!();
            println!("{}", block.title);
            if !block.header.is_empty() {
                println!("  {}", block.header.join(" | "));
            }
            for row in &block.rows {
                println!("  {}", row.join(" | "));
            }
            if !block.footer_total.is_empty() {
                println!("  Total: {}", block.footer_total);
            }
        }
    }

    println!();
    println!("=======================================");
    println!(
        "  Grand total (freight excluded): {:.2}",
        document_total(quote)
    );
    let transit = total_transit_time(quote);
    if transit > 0 {
        println!("  Total transit time: {} days", transit);
    }
    println!("=======================================");
}
