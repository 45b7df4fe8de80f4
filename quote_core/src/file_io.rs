//! # File I/O Module
//!
//! Quote files are `.fqd` (freight quote document) files containing
//! JSON. Two formats load:
//!
//! - the canonical [`Quote`] serialization this crate writes
//! - a raw flat persisted record in any of the three historical
//!   shapes, which is normalized through the schema migrator
//!
//! Saves are atomic: write to a `.tmp` sibling, fsync, rename. An
//! interrupted save never corrupts the existing file.
//!
//! ## Example
//!
//! ```rust,no_run
//! use quote_core::document::{FreightType, Quote};
//! use quote_core::file_io::{load_quote, save_quote};
//! use std::path::Path;
//!
//! let quote = Quote::new(FreightType::Direct);
//! save_quote(&quote, Path::new("offer.fqd"))?;
//! let loaded = load_quote(Path::new("offer.fqd"))?;
//! assert_eq!(loaded.meta.id, quote.meta.id);
//! # Ok::<(), quote_core::errors::QuoteError>(())
//! ```

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use crate::charges::recompute_totals;
use crate::document::{Quote, SCHEMA_VERSION};
use crate::errors::{QuoteError, QuoteResult};
use crate::migrate::{load_quote_record, RawRecord};

/// Save a quote with atomic write semantics.
///
/// 1. Serialize to pretty JSON
/// 2. Write to a `.tmp` sibling file
/// 3. fsync
/// 4. Rename over the destination (atomic on most filesystems)
pub fn save_quote(quote: &Quote, path: &Path) -> QuoteResult<()> {
    let json = serde_json::to_string_pretty(quote).map_err(|e| QuoteError::SerializationError {
        reason: e.to_string(),
    })?;

    let tmp_path = path.with_extension("fqd.tmp");

    let mut tmp_file = File::create(&tmp_path).map_err(|e| {
        QuoteError::file_error(
            "create temp file",
            tmp_path.display().to_string(),
            e.to_string(),
        )
    })?;

    tmp_file.write_all(json.as_bytes()).map_err(|e| {
        QuoteError::file_error(
            "write temp file",
            tmp_path.display().to_string(),
            e.to_string(),
        )
    })?;

    tmp_file.sync_all().map_err(|e| {
        QuoteError::file_error(
            "sync temp file",
            tmp_path.display().to_string(),
            e.to_string(),
        )
    })?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        QuoteError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;

    Ok(())
}

/// Load a quote from a file.
///
/// Canonical files are version-checked; anything that is valid JSON
/// but not a canonical quote is treated as a raw persisted record and
/// normalized through the migrator. Row totals are recomputed in both
/// paths - stored totals are never trusted.
pub fn load_quote(path: &Path) -> QuoteResult<Quote> {
    let mut file = File::open(path)
        .map_err(|e| QuoteError::file_error("open", path.display().to_string(), e.to_string()))?;

    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| QuoteError::file_error("read", path.display().to_string(), e.to_string()))?;

    parse_quote(&contents).map_err(|e| match e {
        QuoteError::SerializationError { reason } => QuoteError::SerializationError {
            reason: format!("{}: {}", path.display(), reason),
        },
        other => other,
    })
}

/// Parse quote JSON from a string (canonical or raw legacy record).
pub fn parse_quote(contents: &str) -> QuoteResult<Quote> {
    // A canonical file always carries a meta block; use it to pick the
    // parse path so legacy records never half-match the canonical type.
    let value: serde_json::Value =
        serde_json::from_str(contents).map_err(|e| QuoteError::SerializationError {
            reason: format!("invalid JSON: {}", e),
        })?;

    let is_canonical = value
        .as_object()
        .map(|obj| obj.contains_key("meta") && obj.contains_key("options"))
        .unwrap_or(false);

    if is_canonical {
        let quote: Quote =
            serde_json::from_value(value).map_err(|e| QuoteError::SerializationError {
                reason: format!("invalid quote document: {}", e),
            })?;
        validate_version(&quote.meta.version)?;
        return Ok(recompute_totals(&quote));
    }

    let record: RawRecord = value
        .as_object()
        .cloned()
        .ok_or_else(|| QuoteError::SerializationError {
            reason: "expected a JSON object".to_string(),
        })?;
    Ok(load_quote_record(&record))
}

/// Validate that a file version is compatible with the current schema.
///
/// Major versions must match; within 0.x, a newer minor than ours is
/// rejected (0.x breaking changes are allowed by semver).
fn validate_version(file_version: &str) -> QuoteResult<()> {
    let file_parts: Vec<u32> = file_version
        .split('.')
        .filter_map(|p| p.parse().ok())
        .collect();
    let current_parts: Vec<u32> = SCHEMA_VERSION
        .split('.')
        .filter_map(|p| p.parse().ok())
        .collect();

    if file_parts.is_empty() || current_parts.is_empty() {
        return Err(QuoteError::VersionMismatch {
            file_version: file_version.to_string(),
            expected_version: SCHEMA_VERSION.to_string(),
        });
    }

    if file_parts[0] != current_parts[0] {
        return Err(QuoteError::VersionMismatch {
            file_version: file_version.to_string(),
            expected_version: SCHEMA_VERSION.to_string(),
        });
    }

    if current_parts[0] == 0
        && file_parts.len() > 1
        && current_parts.len() > 1
        && file_parts[1] > current_parts[1]
    {
        return Err(QuoteError::VersionMismatch {
            file_version: file_version.to_string(),
            expected_version: SCHEMA_VERSION.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charges::document_total;
    use crate::document::FreightType;
    use std::env::temp_dir;
    use std::path::PathBuf;

    fn temp_quote_path(name: &str) -> PathBuf {
        temp_dir().join(format!("freightdesk_test_{}.fqd", name))
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = temp_quote_path("roundtrip");

        let mut quote = Quote::new(FreightType::Direct);
        quote.meta.quote_number = "FQ-2025-0001".to_string();
        quote.meta.customer = "Test Customer".to_string();
        save_quote(&quote, &path).unwrap();

        let loaded = load_quote(&path).unwrap();
        assert_eq!(loaded.meta.quote_number, "FQ-2025-0001");
        assert_eq!(loaded.meta.customer, "Test Customer");
        assert_eq!(loaded.meta.id, quote.meta.id);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_atomic_save_leaves_no_tmp_file() {
        let path = temp_quote_path("atomic");
        let tmp_path = path.with_extension("fqd.tmp");

        let quote = Quote::new(FreightType::Direct);
        save_quote(&quote, &path).unwrap();

        assert!(!tmp_path.exists());
        assert!(path.exists());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_parse_legacy_record_string() {
        let contents = r#"{
            "freightType": "direct",
            "quoteNumber": "FQ-OLD-7",
            "carriers": "[{\"carrier\":\"A\"},{\"carrier\":\"B\"}]",
            "destinationCharges": "[{\"numberOfUnits\":\"1\",\"amount\":\"60\"}]"
        }"#;
        let quote = parse_quote(contents).unwrap();
        assert_eq!(quote.meta.quote_number, "FQ-OLD-7");
        // shared section duplicated across both carriers
        assert_eq!(document_total(&quote), 120.0);
    }

    #[test]
    fn test_legacy_file_loads_same_as_migrating_its_record() {
        let path = temp_quote_path("legacy");
        let contents = r#"{
            "freightType": "direct",
            "carrierOptions": "[{\"carrier\":\"CX\",\"destinationCharges\":[{\"numberOfUnits\":\"2\",\"amount\":\"40\"}]}]"
        }"#;
        fs::write(&path, contents).unwrap();

        let loaded = load_quote(&path).unwrap();
        let record: RawRecord = serde_json::from_str(contents).unwrap();
        let migrated = load_quote_record(&record);
        assert_eq!(loaded.options, migrated.options);
        assert_eq!(document_total(&loaded), 80.0);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let err = parse_quote("{ not json").unwrap_err();
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
    }

    #[test]
    fn test_version_validation() {
        assert!(validate_version(SCHEMA_VERSION).is_ok());
        assert!(validate_version("0.1.5").is_ok());
        assert!(validate_version("1.0.0").is_err());
        assert!(validate_version("0.2.0").is_err());
        assert!(validate_version("junk").is_err());
    }

    #[test]
    fn test_canonical_load_recomputes_totals() {
        let path = temp_quote_path("recompute");
        let mut quote = Quote::new(FreightType::Direct);
        if let crate::document::QuoteOptions::Carriers(ref mut carriers) = quote.options {
            let row = &mut carriers[0].charges.destination[0].charges[0];
            row.number_of_units = "3".to_string();
            row.amount = "10".to_string();
            row.total = 777.0; // stale
        }
        save_quote(&quote, &path).unwrap();

        let loaded = load_quote(&path).unwrap();
        assert_eq!(document_total(&loaded), 30.0);
        if let crate::document::QuoteOptions::Carriers(carriers) = &loaded.options {
            assert_eq!(carriers[0].charges.destination[0].charges[0].total, 30.0);
        }

        let _ = fs::remove_file(&path);
    }
}
