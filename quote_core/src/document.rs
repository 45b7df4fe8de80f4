//! # Quote Document Model
//!
//! The `Quote` struct is the canonical nested container for all rate
//! data. Quotes serialize to `.fqd` (freight quote document) files as
//! human-readable JSON.
//!
//! ## Structure
//!
//! ```text
//! Quote
//! ├── meta: QuoteMetadata (quote number, customer, validity, timestamps)
//! ├── classification (freight category / mode / type, status)
//! └── options: QuoteOptions
//!     ├── Carriers(Vec<CarrierOption>)   direct quotes
//!     │   └── charges: ChargeSet (freight / destination / handling tables)
//!     └── Routes(Vec<RouteOption>)       transit & multimodal quotes
//!         └── segments: Vec<RouteSegment>
//!             └── charges: ChargeSet
//! ```
//!
//! ## Stringly-typed charge fields
//!
//! Every entry field on [`ChargeRow`] is a `String`, even the numeric
//! ones. Rows are round-tripped verbatim from form inputs and legacy
//! records where a blank and a zero are different things (a blank
//! weight-break cell must stay blank on the PDF). Arithmetic always
//! goes through a lenient parse that maps blank/invalid to `0.0`; the
//! derived `total` is the only numeric field and is recomputed on
//! every edit, never trusted from storage.
//!
//! Legacy records wrote row keys in PascalCase as often as camelCase
//! and numbers as bare JSON numbers; serde aliases and a custom
//! deserializer normalize both at the parse boundary so no read site
//! has to branch on casing.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Current schema version for .fqd files
pub const SCHEMA_VERSION: &str = "0.1.0";

/// The six standard air-freight weight-break labels, in display order.
///
/// These are the only unit types the pivoted air-freight editor and the
/// PDF rate matrix know about; rows priced under any other label do not
/// survive a pivot round trip.
pub const WEIGHT_BREAKS: [&str; 6] = ["-45kg", "+45kg", "+100kg", "+300kg", "+500kg", "+1000kg"];

// ============================================================================
// Classification enums
// ============================================================================

/// Air or sea freight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FreightCategory {
    Air,
    Sea,
}

impl FreightCategory {
    /// Lenient parse from a persisted label; unknown values fall back to air.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "sea" => FreightCategory::Sea,
            _ => FreightCategory::Air,
        }
    }
}

impl Default for FreightCategory {
    fn default() -> Self {
        FreightCategory::Air
    }
}

/// Shipment direction / container mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FreightMode {
    Import,
    Export,
    Fcl,
    Lcl,
}

impl FreightMode {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "export" => FreightMode::Export,
            "fcl" => FreightMode::Fcl,
            "lcl" => FreightMode::Lcl,
            _ => FreightMode::Import,
        }
    }
}

impl Default for FreightMode {
    fn default() -> Self {
        FreightMode::Import
    }
}

/// Shape of the quote: which option structure it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FreightType {
    Direct,
    Transit,
    Multimodal,
    Warehouse,
}

impl FreightType {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "transit" => FreightType::Transit,
            "multimodal" => FreightType::Multimodal,
            "warehouse" => FreightType::Warehouse,
            _ => FreightType::Direct,
        }
    }
}

impl Default for FreightType {
    fn default() -> Self {
        FreightType::Direct
    }
}

/// Quote lifecycle status.
///
/// The document core only ever creates quotes as `Draft`; the other
/// values are set by the surrounding workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStatus {
    Draft,
    Active,
    Sent,
    Accepted,
    Rejected,
    Expired,
}

impl QuoteStatus {
    /// Lenient parse from a persisted label; unknown values are drafts.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "active" => QuoteStatus::Active,
            "sent" => QuoteStatus::Sent,
            "accepted" => QuoteStatus::Accepted,
            "rejected" => QuoteStatus::Rejected,
            "expired" => QuoteStatus::Expired,
            _ => QuoteStatus::Draft,
        }
    }
}

impl Default for QuoteStatus {
    fn default() -> Self {
        QuoteStatus::Draft
    }
}

/// Transport mode of a single route segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    Air,
    Sea,
    Trucking,
}

impl TransportMode {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "sea" => TransportMode::Sea,
            "trucking" | "truck" | "road" => TransportMode::Trucking,
            _ => TransportMode::Air,
        }
    }
}

impl Default for TransportMode {
    fn default() -> Self {
        TransportMode::Air
    }
}

// ============================================================================
// Charge rows and tables
// ============================================================================

/// How a table's row totals are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeBasis {
    /// `total = number_of_units * amount`
    PerUnit,
    /// `total = chargeable_weight * charge` (multimodal freight tables)
    PerWeight,
}

impl Default for ChargeBasis {
    fn default() -> Self {
        ChargeBasis::PerUnit
    }
}

/// One priced line item within a [`ChargeTable`].
///
/// All entry fields are strings (see module docs); `total` is derived
/// and recomputed by the calculator on every edit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChargeRow {
    /// Carrier name (freight tables) - first column of the rate matrix
    #[serde(alias = "Carrier", deserialize_with = "stringy")]
    pub carrier: String,

    /// Charge description (handling/destination tables)
    #[serde(alias = "ChargeName", deserialize_with = "stringy")]
    pub charge_name: String,

    /// Pricing bracket label, e.g. `+100kg`, or a unit like `per shipment`
    #[serde(alias = "UnitType", deserialize_with = "stringy")]
    pub unit_type: String,

    #[serde(alias = "NumberOfUnits", deserialize_with = "stringy")]
    pub number_of_units: String,

    #[serde(alias = "Amount", deserialize_with = "stringy")]
    pub amount: String,

    #[serde(alias = "Currency", deserialize_with = "stringy")]
    pub currency: String,

    #[serde(alias = "TransitTime", deserialize_with = "stringy")]
    pub transit_time: String,

    #[serde(alias = "NumberOfRouting", deserialize_with = "stringy")]
    pub number_of_routing: String,

    #[serde(alias = "Surcharge", deserialize_with = "stringy")]
    pub surcharge: String,

    #[serde(alias = "Frequency", deserialize_with = "stringy")]
    pub frequency: String,

    #[serde(alias = "Remarks", deserialize_with = "stringy")]
    pub remarks: String,

    /// Weight-based pricing fields (multimodal freight tables)
    #[serde(alias = "ChargeableWeight", deserialize_with = "stringy")]
    pub chargeable_weight: String,

    #[serde(alias = "WeightBreaker", deserialize_with = "stringy")]
    pub weight_breaker: String,

    #[serde(alias = "Charge", deserialize_with = "stringy")]
    pub charge: String,

    /// Derived row total. Never trusted from storage; the calculator
    /// recomputes it on every edit and the projector recomputes it
    /// again before display.
    #[serde(alias = "Total", deserialize_with = "stringy_f64")]
    pub total: f64,
}

impl ChargeRow {
    /// An all-blank row, the minimum content of any table.
    pub fn empty() -> Self {
        ChargeRow::default()
    }
}

/// A named, never-empty ordered collection of charge rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChargeTable {
    #[serde(alias = "TableName", deserialize_with = "stringy")]
    pub table_name: String,

    pub basis: ChargeBasis,

    /// Invariant: never empty. Enforced by the calculator/assembler
    /// no-op rules, and restored here on deserialization.
    #[serde(alias = "Charges", alias = "rows")]
    pub charges: Vec<ChargeRow>,
}

impl ChargeTable {
    /// A single-blank-row table with the given name.
    pub fn with_name(name: impl Into<String>, basis: ChargeBasis) -> Self {
        ChargeTable {
            table_name: name.into(),
            basis,
            charges: vec![ChargeRow::empty()],
        }
    }

    /// Restore the never-empty invariant after lossy input.
    pub fn ensure_non_empty(mut self) -> Self {
        if self.charges.is_empty() {
            self.charges.push(ChargeRow::empty());
        }
        self
    }
}

impl Default for ChargeTable {
    fn default() -> Self {
        ChargeTable::with_name("", ChargeBasis::PerUnit)
    }
}

/// Which of the four charge collections a table belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeSection {
    Freight,
    Destination,
    OriginHandling,
    DestinationHandling,
}

impl ChargeSection {
    /// Section title as printed on the PDF.
    pub fn title(&self) -> &'static str {
        match self {
            ChargeSection::Freight => "Freight Charges",
            ChargeSection::Destination => "Destination Charges",
            ChargeSection::OriginHandling => "Origin Handling Charges",
            ChargeSection::DestinationHandling => "Destination Handling Charges",
        }
    }

    /// All four sections in display order.
    pub fn all() -> [ChargeSection; 4] {
        [
            ChargeSection::Freight,
            ChargeSection::Destination,
            ChargeSection::OriginHandling,
            ChargeSection::DestinationHandling,
        ]
    }
}

/// The four charge-table collections carried by every carrier option
/// and every route segment.
///
/// Invariant: each collection holds at least one table, and element 0
/// is the default table which can never be removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChargeSet {
    #[serde(alias = "FreightCharges", alias = "freightCharges")]
    pub freight: Vec<ChargeTable>,

    #[serde(alias = "DestinationCharges", alias = "destinationCharges")]
    pub destination: Vec<ChargeTable>,

    #[serde(alias = "OriginHandling", alias = "originHandling")]
    pub origin_handling: Vec<ChargeTable>,

    #[serde(alias = "DestinationHandling", alias = "destinationHandling")]
    pub destination_handling: Vec<ChargeTable>,
}

impl ChargeSet {
    /// A minimal valid set: one single-blank-row table per collection.
    pub fn new() -> Self {
        ChargeSet {
            freight: vec![ChargeTable::with_name("Freight Charges", ChargeBasis::PerUnit)],
            destination: vec![ChargeTable::with_name(
                "Destination Charges",
                ChargeBasis::PerUnit,
            )],
            origin_handling: vec![ChargeTable::with_name(
                "Origin Handling",
                ChargeBasis::PerUnit,
            )],
            destination_handling: vec![ChargeTable::with_name(
                "Destination Handling",
                ChargeBasis::PerUnit,
            )],
        }
    }

    /// A minimal valid set whose freight tables price by chargeable
    /// weight (multimodal freight).
    pub fn weight_based() -> Self {
        let mut set = ChargeSet::new();
        for table in set.freight.iter_mut() {
            table.basis = ChargeBasis::PerWeight;
        }
        set
    }

    /// Borrow one collection by section.
    pub fn section(&self, section: ChargeSection) -> &Vec<ChargeTable> {
        match section {
            ChargeSection::Freight => &self.freight,
            ChargeSection::Destination => &self.destination,
            ChargeSection::OriginHandling => &self.origin_handling,
            ChargeSection::DestinationHandling => &self.destination_handling,
        }
    }

    /// Mutably borrow one collection by section.
    pub fn section_mut(&mut self, section: ChargeSection) -> &mut Vec<ChargeTable> {
        match section {
            ChargeSection::Freight => &mut self.freight,
            ChargeSection::Destination => &mut self.destination,
            ChargeSection::OriginHandling => &mut self.origin_handling,
            ChargeSection::DestinationHandling => &mut self.destination_handling,
        }
    }

    /// Restore per-collection invariants after deserializing legacy data.
    pub fn ensure_non_empty(mut self) -> Self {
        for section in ChargeSection::all() {
            let tables = self.section_mut(section);
            if tables.is_empty() {
                tables.push(ChargeTable::default());
            }
            for table in tables.iter_mut() {
                if table.charges.is_empty() {
                    table.charges.push(ChargeRow::empty());
                }
            }
        }
        self
    }
}

impl Default for ChargeSet {
    fn default() -> Self {
        ChargeSet::new()
    }
}

// ============================================================================
// Options, routes, segments
// ============================================================================

/// One alternative rate scenario for a direct quote.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CarrierOption {
    #[serde(alias = "Carrier", deserialize_with = "stringy")]
    pub carrier: String,

    #[serde(alias = "Incoterm", deserialize_with = "stringy")]
    pub incoterm: String,

    #[serde(alias = "Currency", deserialize_with = "stringy")]
    pub currency: String,

    #[serde(alias = "CargoType", deserialize_with = "stringy")]
    pub cargo_type: String,

    #[serde(flatten)]
    pub charges: ChargeSet,
}

impl CarrierOption {
    pub fn new() -> Self {
        CarrierOption::default()
    }
}

/// Mode-specific equipment details for one segment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Equipment {
    #[serde(alias = "TransitTime", deserialize_with = "stringy")]
    pub transit_time: String,

    #[serde(alias = "Container", deserialize_with = "stringy")]
    pub container: String,

    #[serde(alias = "VesselOrFlight", deserialize_with = "stringy")]
    pub vessel_or_flight: String,
}

/// One leg (single transport mode, origin to destination) of a route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RouteSegment {
    pub mode: TransportMode,

    #[serde(alias = "Origin", deserialize_with = "stringy")]
    pub origin: String,

    #[serde(alias = "Destination", deserialize_with = "stringy")]
    pub destination: String,

    pub equipment: Equipment,

    #[serde(flatten)]
    pub charges: ChargeSet,
}

impl RouteSegment {
    pub fn new() -> Self {
        RouteSegment::default()
    }
}

/// A named alternative path for transit and multimodal quotes.
///
/// Invariant: `segments` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RouteOption {
    #[serde(alias = "RouteName", deserialize_with = "stringy")]
    pub route_name: String,

    pub segments: Vec<RouteSegment>,
}

impl RouteOption {
    pub fn new() -> Self {
        RouteOption::default()
    }
}

impl Default for RouteOption {
    fn default() -> Self {
        RouteOption {
            route_name: String::new(),
            segments: vec![RouteSegment::new()],
        }
    }
}

/// The top-level option list, shaped by freight type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "items", rename_all = "camelCase")]
pub enum QuoteOptions {
    /// Direct quotes: one entry per carrier
    Carriers(Vec<CarrierOption>),
    /// Transit/multimodal quotes: one entry per alternative route
    Routes(Vec<RouteOption>),
}

impl QuoteOptions {
    /// Number of top-level options.
    pub fn len(&self) -> usize {
        match self {
            QuoteOptions::Carriers(c) => c.len(),
            QuoteOptions::Routes(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every charge set in the document, in option/segment order.
    pub fn charge_sets(&self) -> Vec<&ChargeSet> {
        match self {
            QuoteOptions::Carriers(carriers) => carriers.iter().map(|c| &c.charges).collect(),
            QuoteOptions::Routes(routes) => routes
                .iter()
                .flat_map(|r| r.segments.iter().map(|s| &s.charges))
                .collect(),
        }
    }
}

// ============================================================================
// Quote root
// ============================================================================

/// Quote metadata: identity, customer, validity window, timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuoteMetadata {
    /// Stable document identity
    pub id: Uuid,

    /// Schema version (for migration compatibility)
    pub version: String,

    #[serde(alias = "QuoteNumber", deserialize_with = "stringy")]
    pub quote_number: String,

    #[serde(alias = "Customer", deserialize_with = "stringy")]
    pub customer: String,

    #[serde(alias = "Origin", deserialize_with = "stringy")]
    pub origin: String,

    #[serde(alias = "Destination", deserialize_with = "stringy")]
    pub destination: String,

    pub validity_from: Option<NaiveDate>,
    pub validity_to: Option<NaiveDate>,

    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Default for QuoteMetadata {
    fn default() -> Self {
        let now = Utc::now();
        QuoteMetadata {
            id: Uuid::new_v4(),
            version: SCHEMA_VERSION.to_string(),
            quote_number: String::new(),
            customer: String::new(),
            origin: String::new(),
            destination: String::new(),
            validity_from: None,
            validity_to: None,
            created: now,
            modified: now,
        }
    }
}

/// Root quote container.
///
/// This is the canonical nested document every other component works
/// on: the migrator produces it, the assembler transitions it, the
/// calculator totals it and the projector flattens it for PDF export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Quote {
    pub meta: QuoteMetadata,

    pub freight_category: FreightCategory,
    pub freight_mode: FreightMode,
    pub freight_type: FreightType,
    pub status: QuoteStatus,

    pub options: QuoteOptions,

    /// Free-text terms and conditions printed at the end of the PDF
    pub terms: String,
}

impl Quote {
    /// Create a minimal valid quote for the given type: one option,
    /// one segment where applicable, four single-blank-row charge
    /// collections.
    ///
    /// # Example
    ///
    /// ```rust
    /// use quote_core::document::{FreightType, Quote, QuoteOptions};
    ///
    /// let quote = Quote::new(FreightType::Transit);
    /// match &quote.options {
    ///     QuoteOptions::Routes(routes) => {
    ///         assert_eq!(routes.len(), 1);
    ///         assert_eq!(routes[0].segments.len(), 1);
    ///     }
    ///     _ => panic!("transit quotes carry routes"),
    /// }
    /// ```
    pub fn new(freight_type: FreightType) -> Self {
        let options = match freight_type {
            FreightType::Direct | FreightType::Warehouse => {
                QuoteOptions::Carriers(vec![CarrierOption::new()])
            }
            FreightType::Transit => QuoteOptions::Routes(vec![RouteOption::new()]),
            FreightType::Multimodal => {
                // Multimodal freight tables price by chargeable weight
                let mut route = RouteOption::new();
                for segment in route.segments.iter_mut() {
                    segment.charges = ChargeSet::weight_based();
                }
                QuoteOptions::Routes(vec![route])
            }
        };
        Quote {
            meta: QuoteMetadata::default(),
            freight_category: FreightCategory::default(),
            freight_mode: FreightMode::default(),
            freight_type,
            status: QuoteStatus::Draft,
            options,
            terms: String::new(),
        }
    }

    /// Update the modified timestamp.
    pub fn touch(&mut self) {
        self.meta.modified = Utc::now();
    }
}

impl Default for Quote {
    fn default() -> Self {
        Quote::new(FreightType::Direct)
    }
}

// ============================================================================
// Lenient value parsing
// ============================================================================

/// Parse a user-entered or persisted numeric string leniently.
///
/// Blank or unparseable input is `0.0`; thousands separators are
/// tolerated since legacy records contain amounts like `"1,200"`.
pub fn parse_amount(value: &str) -> f64 {
    let cleaned = value.trim().replace(',', "");
    if cleaned.is_empty() {
        return 0.0;
    }
    cleaned.parse::<f64>().unwrap_or(0.0)
}

/// Leading-integer parse with the semantics legacy transit times rely
/// on: `"3"` -> 3, `"5 days"` -> 5, `""`/`"abc"` -> 0.
pub fn parse_leading_int(value: &str) -> i64 {
    let trimmed = value.trim();
    let digits: String = trimmed
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<i64>().unwrap_or(0)
}

/// Deserialize a string field that legacy records may have written as
/// a bare number (or null).
fn stringy<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value_to_string(&value))
}

/// Deserialize a stored total that may be a number, a numeric string,
/// or absent.
fn stringy_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => parse_amount(&s),
        _ => 0.0,
    })
}

/// Render a JSON scalar the way the legacy forms did: numbers without
/// a trailing `.0`, null as blank.
pub(crate) fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else {
                n.to_string()
            }
        }
        serde_json::Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}
