//! # Schema Migration
//!
//! Quotes were persisted under three historically different shapes.
//! This module normalizes all of them into the canonical nested
//! document, once, at the load boundary - no other component ever
//! sniffs structure again.
//!
//! ## Persisted record
//!
//! The store hands us a flat record (`RawRecord`) whose section fields
//! (`carrierOptions`, `routes`/`transitRoutes`, `equipment`,
//! `termsConditions`, ...) are JSON-encoded strings, each independently
//! optional and independently parseable. Keys appear in camelCase or
//! PascalCase depending on which era wrote the record; both are checked.
//!
//! ## The three shapes
//!
//! | Shape          | Marker                                         |
//! |----------------|------------------------------------------------|
//! | `Canonical`    | `carrierOptions` parses to a JSON array        |
//! | `CarrierKeyed` | `carrierOptions` parses to an object keyed by carrier name |
//! | `FlatSections` | sibling `carriers` + shared per-section arrays |
//!
//! Anything else is `Empty` and migrates to one blank carrier option.
//! The shape is decided exactly once by [`detect_shape`] and carried as
//! a [`RecordShape`] discriminant; [`migrate`] matches on it.
//!
//! ## FlatSections duplication
//!
//! The oldest shape stored one shared `freightCharges` (etc.) array
//! next to a `carriers` list. Migration gives **every** carrier a copy
//! of the same shared arrays, which makes all carriers report identical
//! pricing. That is what the system has always done and downstream
//! totals depend on it; this module reproduces it rather than guessing
//! at the intended fix. See DESIGN.md.
//!
//! ## Error handling
//!
//! Migration is total. A malformed JSON string in any one field falls
//! back to that field's empty default; the rest of the record still
//! migrates.

use serde_json::Value;

use crate::charges::recompute_totals;
use crate::document::{
    value_to_string, CarrierOption, ChargeBasis, ChargeRow, ChargeSet, ChargeTable, Equipment,
    FreightCategory, FreightMode, FreightType, Quote, QuoteOptions, QuoteStatus, RouteOption,
    RouteSegment, TransportMode,
};

/// A flat persisted quote record, exactly as the store returns it.
pub type RawRecord = serde_json::Map<String, Value>;

/// Which historical shape a record was persisted under.
///
/// Decided once at parse time; everything downstream matches on this
/// instead of re-sniffing field presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    /// `carrierOptions` is already the canonical array
    Canonical,
    /// `carrierOptions` is an object keyed by carrier name
    CarrierKeyed,
    /// Separate `carriers` + shared per-section charge arrays
    FlatSections,
    /// No recognizable option data
    Empty,
}

/// Look up a record field under its camelCase name, falling back to
/// the PascalCase variant older records used.
pub fn get_field<'a>(record: &'a RawRecord, name: &str) -> Option<&'a Value> {
    if let Some(value) = record.get(name) {
        return Some(value);
    }
    let mut pascal = String::with_capacity(name.len());
    let mut chars = name.chars();
    if let Some(first) = chars.next() {
        pascal.extend(first.to_uppercase());
        pascal.push_str(chars.as_str());
    }
    record.get(&pascal)
}

/// Decode one section field: fields are JSON-encoded strings, but
/// records written mid-transition hold plain JSON values, so both are
/// accepted. A parse failure is `None` - the section falls back to its
/// default and the rest of the record is unaffected.
fn section_value(record: &RawRecord, name: &str) -> Option<Value> {
    match get_field(record, name)? {
        Value::String(encoded) => serde_json::from_str(encoded).ok(),
        Value::Null => None,
        other => Some(other.clone()),
    }
}

/// String-valued record field (not JSON-encoded), blank when absent.
fn string_field(record: &RawRecord, name: &str) -> String {
    get_field(record, name).map(value_to_string).unwrap_or_default()
}

/// Decide which historical shape this record was persisted under.
pub fn detect_shape(record: &RawRecord) -> RecordShape {
    match section_value(record, "carrierOptions") {
        Some(Value::Array(_)) => return RecordShape::Canonical,
        Some(Value::Object(_)) => return RecordShape::CarrierKeyed,
        _ => {}
    }
    if get_field(record, "carriers").is_some() {
        return RecordShape::FlatSections;
    }
    RecordShape::Empty
}

/// Normalize a persisted record's option data into canonical carrier
/// options. Never fails and never returns an empty list.
pub fn migrate(record: &RawRecord) -> Vec<CarrierOption> {
    let options = match detect_shape(record) {
        RecordShape::Canonical => match section_value(record, "carrierOptions") {
            Some(Value::Array(entries)) => entries
                .iter()
                .map(|entry| carrier_option_from_value(entry, None))
                .collect(),
            _ => Vec::new(),
        },
        RecordShape::CarrierKeyed => match section_value(record, "carrierOptions") {
            Some(Value::Object(by_carrier)) => by_carrier
                .iter()
                .map(|(carrier, entry)| carrier_option_from_value(entry, Some(carrier)))
                .collect(),
            _ => Vec::new(),
        },
        RecordShape::FlatSections => migrate_flat_sections(record),
        RecordShape::Empty => Vec::new(),
    };

    if options.is_empty() {
        vec![CarrierOption::new()]
    } else {
        options
    }
}

/// Legacy-v1: one shared array per section next to a `carriers` list.
///
/// Every carrier receives a copy of the same shared arrays (see module
/// docs for why this duplication is preserved).
fn migrate_flat_sections(record: &RawRecord) -> Vec<CarrierOption> {
    let shared = ChargeSet {
        freight: tables_from_value(section_value(record, "freightCharges").as_ref()),
        destination: tables_from_value(section_value(record, "destinationCharges").as_ref()),
        origin_handling: tables_from_value(section_value(record, "originHandling").as_ref()),
        destination_handling: tables_from_value(
            section_value(record, "destinationHandling").as_ref(),
        ),
    };

    let carriers = match section_value(record, "carriers") {
        Some(Value::Array(entries)) => entries,
        _ => Vec::new(),
    };

    carriers
        .iter()
        .map(|entry| {
            let carrier = match entry {
                Value::Object(fields) => fields
                    .get("carrier")
                    .or_else(|| fields.get("Carrier"))
                    .map(value_to_string)
                    .unwrap_or_default(),
                other => value_to_string(other),
            };
            CarrierOption {
                carrier,
                incoterm: String::new(),
                currency: String::new(),
                cargo_type: String::new(),
                charges: shared.clone(),
            }
        })
        .collect()
}

/// Build one canonical carrier option from a canonical array entry or
/// a carrier-keyed object value. `carrier_key` overrides the carrier
/// name for the keyed shape.
fn carrier_option_from_value(value: &Value, carrier_key: Option<&str>) -> CarrierOption {
    let Value::Object(fields) = value else {
        let mut option = CarrierOption::new();
        option.carrier = carrier_key.unwrap_or_default().to_string();
        return option;
    };

    let lookup = |names: &[&str]| -> Option<Value> {
        names
            .iter()
            .find_map(|name| get_field(fields, name))
            .cloned()
    };
    let text = |names: &[&str]| lookup(names).map(|v| value_to_string(&v)).unwrap_or_default();

    let carrier = match carrier_key {
        Some(key) => key.to_string(),
        None => text(&["carrier"]),
    };

    CarrierOption {
        carrier,
        incoterm: text(&["incoterm"]),
        currency: text(&["currency"]),
        cargo_type: text(&["cargoType"]),
        charges: ChargeSet {
            freight: tables_from_value(lookup(&["freight", "freightCharges"]).as_ref()),
            destination: tables_from_value(lookup(&["destination", "destinationCharges"]).as_ref()),
            origin_handling: tables_from_value(lookup(&["originHandling"]).as_ref()),
            destination_handling: tables_from_value(lookup(&["destinationHandling"]).as_ref()),
        },
    }
}

/// Normalize one persisted charge collection into canonical tables.
///
/// Accepts: an array of table objects (entries carrying a `charges`
/// row array), a bare array of row objects (the common legacy case -
/// becomes one table), or a doubly JSON-encoded string of either.
/// Anything else, including `None`, is one blank default table.
pub fn tables_from_value(value: Option<&Value>) -> Vec<ChargeTable> {
    match value {
        Some(Value::String(encoded)) => match serde_json::from_str::<Value>(encoded) {
            Ok(inner) => tables_from_value(Some(&inner)),
            Err(_) => vec![ChargeTable::default()],
        },
        Some(Value::Array(entries)) => {
            let looks_like_tables = entries.iter().any(|entry| {
                entry
                    .as_object()
                    .map(|obj| obj.contains_key("charges") || obj.contains_key("Charges"))
                    .unwrap_or(false)
            });
            let tables: Vec<ChargeTable> = if looks_like_tables {
                entries
                    .iter()
                    .map(|entry| {
                        serde_json::from_value::<ChargeTable>(entry.clone())
                            .unwrap_or_default()
                            .ensure_non_empty()
                    })
                    .collect()
            } else {
                vec![ChargeTable {
                    table_name: String::new(),
                    basis: ChargeBasis::PerUnit,
                    charges: entries.iter().flat_map(charge_rows_from).collect(),
                }
                .ensure_non_empty()]
            };
            if tables.is_empty() {
                vec![ChargeTable::default()]
            } else {
                tables
            }
        }
        _ => vec![ChargeTable::default()],
    }
}

/// Keys that mark an object as a charge row of some era.
const ROW_KEYS: [&str; 11] = [
    "carrier",
    "chargeName",
    "unitType",
    "numberOfUnits",
    "amount",
    "currency",
    "chargeableWeight",
    "weightBreaker",
    "charge",
    "transitTime",
    "remarks",
];

/// Flatten any persisted table-ish value into charge rows.
///
/// Handles every shape the legacy store and the legacy PDF path ever
/// produced: a table object with a nested `charges` array (used
/// directly); an object carrying direct `chargeableWeight`/
/// `weightBreaker`/`charge` fields (one weight-based row); an object
/// of `...PerLocation` matrices (one row per location that has a
/// non-empty charge name or amount); a bare row object; an array of
/// any of these; a JSON-encoded string of any of these. Anything else
/// is an empty list, never an error.
pub fn charge_rows_from(value: &Value) -> Vec<ChargeRow> {
    match value {
        Value::String(encoded) => match serde_json::from_str::<Value>(encoded) {
            Ok(inner) => charge_rows_from(&inner),
            Err(_) => Vec::new(),
        },
        Value::Array(entries) => entries.iter().flat_map(charge_rows_from).collect(),
        Value::Object(fields) => {
            if let Some(charges) = get_field(fields, "charges") {
                return charge_rows_from(charges);
            }
            if get_field(fields, "chargeNamePerLocation").is_some()
                || get_field(fields, "amountPerLocation").is_some()
            {
                return location_rows(fields);
            }
            let is_row = ROW_KEYS.iter().any(|key| get_field(fields, key).is_some());
            if is_row {
                return serde_json::from_value::<ChargeRow>(value.clone())
                    .map(|row| vec![row])
                    .unwrap_or_default();
            }
            Vec::new()
        }
        _ => Vec::new(),
    }
}

/// Expand a location-keyed charge matrix into one row per location.
///
/// A location contributes a row only when its charge name or amount is
/// non-empty; blank columns of the matrix are skipped.
fn location_rows(fields: &RawRecord) -> Vec<ChargeRow> {
    let map_for = |name: &str| -> serde_json::Map<String, Value> {
        get_field(fields, name)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    };

    let names = map_for("chargeNamePerLocation");
    let amounts = map_for("amountPerLocation");
    let currencies = map_for("currencyPerLocation");
    let units = map_for("numberOfUnitsPerLocation");
    let unit_types = map_for("unitTypePerLocation");

    let mut locations: Vec<String> = names.keys().cloned().collect();
    for key in amounts.keys() {
        if !locations.contains(key) {
            locations.push(key.clone());
        }
    }

    locations
        .into_iter()
        .filter_map(|location| {
            let pick = |map: &serde_json::Map<String, Value>| {
                map.get(&location).map(value_to_string).unwrap_or_default()
            };
            let charge_name = pick(&names);
            let amount = pick(&amounts);
            if charge_name.is_empty() && amount.is_empty() {
                return None;
            }
            let mut row = ChargeRow::empty();
            // fall back to the location key as the printed label
            row.charge_name = if charge_name.is_empty() {
                location.clone()
            } else {
                charge_name
            };
            row.amount = amount;
            row.currency = pick(&currencies);
            row.number_of_units = pick(&units);
            row.unit_type = pick(&unit_types);
            Some(row)
        })
        .collect()
}

/// Normalize the `routes`/`transitRoutes` section into route options.
fn routes_from_record(record: &RawRecord, freight_type: FreightType) -> Vec<RouteOption> {
    let value = section_value(record, "routes")
        .or_else(|| section_value(record, "transitRoutes"));

    let mut routes: Vec<RouteOption> = match value {
        Some(Value::Array(entries)) => entries
            .iter()
            .map(|entry| route_option_from_value(entry))
            .collect(),
        _ => Vec::new(),
    };

    if routes.is_empty() {
        routes.push(RouteOption::new());
    }

    // Multimodal freight tables price by chargeable weight
    if freight_type == FreightType::Multimodal {
        for route in routes.iter_mut() {
            for segment in route.segments.iter_mut() {
                for table in segment.charges.freight.iter_mut() {
                    table.basis = ChargeBasis::PerWeight;
                }
            }
        }
    }
    routes
}

fn route_option_from_value(value: &Value) -> RouteOption {
    let Value::Object(fields) = value else {
        return RouteOption::new();
    };

    let route_name = get_field(fields, "routeName")
        .or_else(|| get_field(fields, "name"))
        .map(value_to_string)
        .unwrap_or_default();

    let mut segments: Vec<RouteSegment> = match get_field(fields, "segments") {
        Some(Value::Array(entries)) => entries
            .iter()
            .map(|entry| segment_from_value(entry))
            .collect(),
        _ => Vec::new(),
    };
    if segments.is_empty() {
        segments.push(RouteSegment::new());
    }

    RouteOption {
        route_name,
        segments,
    }
}

fn segment_from_value(value: &Value) -> RouteSegment {
    let Value::Object(fields) = value else {
        return RouteSegment::new();
    };

    let text = |name: &str| get_field(fields, name).map(value_to_string).unwrap_or_default();

    let equipment = match get_field(fields, "equipment") {
        Some(v) => serde_json::from_value::<Equipment>(v.clone()).unwrap_or_default(),
        None => Equipment {
            // oldest records stored equipment fields flat on the segment
            transit_time: text("transitTime"),
            container: text("container"),
            vessel_or_flight: text("vesselOrFlight"),
        },
    };

    RouteSegment {
        mode: TransportMode::from_label(&text("mode")),
        origin: text("origin"),
        destination: text("destination"),
        equipment,
        charges: ChargeSet {
            freight: tables_from_value(
                get_field(fields, "freight")
                    .or_else(|| get_field(fields, "freightCharges")),
            ),
            destination: tables_from_value(
                get_field(fields, "destination")
                    .or_else(|| get_field(fields, "destinationCharges")),
            ),
            origin_handling: tables_from_value(get_field(fields, "originHandling")),
            destination_handling: tables_from_value(get_field(fields, "destinationHandling")),
        },
    }
}

/// Assemble the whole canonical quote from a raw persisted record.
///
/// Everything is normalized here, once: classification enums from
/// their string labels, options or routes per freight type, terms,
/// validity window, and row totals (stored totals are discarded and
/// recomputed).
pub fn load_quote_record(record: &RawRecord) -> Quote {
    let freight_type = FreightType::from_label(&string_field(record, "freightType"));

    let options = match freight_type {
        FreightType::Direct | FreightType::Warehouse => QuoteOptions::Carriers(migrate(record)),
        FreightType::Transit | FreightType::Multimodal => {
            QuoteOptions::Routes(routes_from_record(record, freight_type))
        }
    };

    let mut quote = Quote::new(freight_type);
    quote.meta.quote_number = string_field(record, "quoteNumber");
    quote.meta.customer = string_field(record, "customer");
    quote.meta.origin = string_field(record, "origin");
    quote.meta.destination = string_field(record, "destination");
    quote.meta.validity_from = parse_date(&string_field(record, "validityFrom"));
    quote.meta.validity_to = parse_date(&string_field(record, "validityTo"));
    quote.freight_category = FreightCategory::from_label(&string_field(record, "freightCategory"));
    quote.freight_mode = FreightMode::from_label(&string_field(record, "freightMode"));
    quote.status = QuoteStatus::from_label(&string_field(record, "status"));
    quote.terms = string_field(record, "termsConditions");
    quote.options = options;

    recompute_totals(&quote)
}

fn parse_date(value: &str) -> Option<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}
