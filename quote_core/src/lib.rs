//! # quote_core - Freight Quote Document Engine
//!
//! `quote_core` is the document core of Freightdesk: the canonical
//! nested schema for multi-section rate quotes, the migration logic
//! that normalizes three historical persisted shapes into it, the
//! charge-table calculator, the air-freight pivot transform and the
//! projection consumed by PDF export. All types are JSON-serializable.
//!
//! ## Design Philosophy
//!
//! - **Snapshots**: the document is immutable; every edit operation
//!   returns a new version, so no state is shared and nothing needs a
//!   lock
//! - **Total at the core**: malformed or missing persisted data
//!   degrades to empty defaults, never to an error - a broken section
//!   must not take the whole quote down
//! - **Normalize once**: shape sniffing and key-casing tolerance live
//!   at the load boundary; canonical data flows everywhere else
//! - **Never trust stored totals**: row totals are recomputed on every
//!   edit, on load and before rendering
//!
//! ## Quick Start
//!
//! ```rust
//! use quote_core::charges::{document_total, update_row, ChargeField};
//! use quote_core::document::{FreightType, Quote, QuoteOptions};
//!
//! let mut quote = Quote::new(FreightType::Direct);
//! if let QuoteOptions::Carriers(ref mut carriers) = quote.options {
//!     let table = &carriers[0].charges.destination[0];
//!     let table = update_row(table, 0, ChargeField::NumberOfUnits, "3");
//!     let table = update_row(&table, 0, ChargeField::Amount, "120");
//!     carriers[0].charges.destination[0] = table;
//! }
//! assert_eq!(document_total(&quote), 360.0);
//! ```
//!
//! ## Modules
//!
//! - [`document`] - The canonical nested quote document and enums
//! - [`charges`] - Row/table/document total arithmetic
//! - [`pivot`] - Carrier x weight-break matrix transform (air freight)
//! - [`migrate`] - Legacy shape detection and normalization
//! - [`assembler`] - Structural copy-on-write operations
//! - [`render`] - Report blocks and pagination for PDF export
//! - [`errors`] - Structured error types
//! - [`file_io`] - Atomic saves and format-tolerant loads

pub mod assembler;
pub mod charges;
pub mod document;
pub mod errors;
pub mod file_io;
pub mod migrate;
pub mod pivot;
pub mod render;

// Re-export commonly used types at crate root for convenience
pub use charges::{document_total, ChargeField};
pub use document::{Quote, QuoteOptions, SCHEMA_VERSION, WEIGHT_BREAKS};
pub use errors::{QuoteError, QuoteResult};
pub use file_io::{load_quote, save_quote};
pub use migrate::{migrate, RawRecord, RecordShape};
