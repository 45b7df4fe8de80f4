//! # Document Assembler
//!
//! Structural operations on the canonical quote document. Every
//! operation is copy-on-write: it takes the current snapshot by
//! reference and returns the next snapshot; callers swap it in. There
//! is no shared mutable state to coordinate.
//!
//! Structural invariants are enforced as defined no-ops, never errors:
//!
//! - the top-level option list always keeps at least one option
//! - a route always keeps at least one segment
//! - each charge collection always keeps at least one table, and its
//!   element 0 (the default table) can never be removed
//!
//! A caller that asks for an illegal removal simply gets the unchanged
//! document back, so no single operation can leave the document in an
//! invalid state.

use crate::document::{
    parse_leading_int, CarrierOption, ChargeSection, ChargeSet, ChargeTable, FreightType, Quote,
    QuoteOptions, RouteOption, RouteSegment,
};

/// Append a new blank option of the kind the quote carries.
pub fn add_option(quote: &Quote) -> Quote {
    let mut next = quote.clone();
    match &mut next.options {
        QuoteOptions::Carriers(carriers) => carriers.push(CarrierOption::new()),
        QuoteOptions::Routes(routes) => {
            let route = if quote.freight_type == FreightType::Multimodal {
                let mut route = RouteOption::new();
                for segment in route.segments.iter_mut() {
                    segment.charges = ChargeSet::weight_based();
                }
                route
            } else {
                RouteOption::new()
            };
            routes.push(route);
        }
    }
    next.touch();
    next
}

/// Remove the option at `index`. No-op when it is the last option or
/// the index is out of range.
pub fn remove_option(quote: &Quote, index: usize) -> Quote {
    if quote.options.len() <= 1 || index >= quote.options.len() {
        return quote.clone();
    }
    let mut next = quote.clone();
    match &mut next.options {
        QuoteOptions::Carriers(carriers) => {
            carriers.remove(index);
        }
        QuoteOptions::Routes(routes) => {
            routes.remove(index);
        }
    }
    next.touch();
    next
}

/// Append a blank segment to the route at `route_index`. No-op on a
/// carrier-option quote or an out-of-range route.
pub fn add_segment(quote: &Quote, route_index: usize) -> Quote {
    let mut next = quote.clone();
    let QuoteOptions::Routes(routes) = &mut next.options else {
        return quote.clone();
    };
    let Some(route) = routes.get_mut(route_index) else {
        return quote.clone();
    };
    let mut segment = RouteSegment::new();
    if quote.freight_type == FreightType::Multimodal {
        segment.charges = ChargeSet::weight_based();
    }
    route.segments.push(segment);
    next.touch();
    next
}

/// Remove a segment from a route. No-op when it is the route's last
/// segment or either index is out of range.
pub fn remove_segment(quote: &Quote, route_index: usize, segment_index: usize) -> Quote {
    let mut next = quote.clone();
    let QuoteOptions::Routes(routes) = &mut next.options else {
        return quote.clone();
    };
    let Some(route) = routes.get_mut(route_index) else {
        return quote.clone();
    };
    if route.segments.len() <= 1 || segment_index >= route.segments.len() {
        return quote.clone();
    }
    route.segments.remove(segment_index);
    next.touch();
    next
}

/// Append a blank table to one charge collection of a set.
pub fn add_table(set: &ChargeSet, section: ChargeSection) -> ChargeSet {
    let mut next = set.clone();
    let basis = next
        .section(section)
        .first()
        .map(|table| table.basis)
        .unwrap_or_default();
    next.section_mut(section)
        .push(ChargeTable::with_name("", basis));
    next
}

/// Remove a table from one charge collection. Index 0 is the default
/// table and can never be removed, regardless of collection size;
/// out-of-range indexes are also no-ops.
pub fn remove_table(set: &ChargeSet, section: ChargeSection, index: usize) -> ChargeSet {
    if index == 0 || index >= set.section(section).len() {
        return set.clone();
    }
    let mut next = set.clone();
    next.section_mut(section).remove(index);
    next
}

/// Total transit time across every segment of every route option, in
/// whole days. Each segment contributes the leading integer of its
/// equipment transit time (blank or unparseable counts as zero).
/// Derived on demand, never stored.
pub fn total_transit_time(quote: &Quote) -> i64 {
    match &quote.options {
        QuoteOptions::Carriers(_) => 0,
        QuoteOptions::Routes(routes) => routes
            .iter()
            .flat_map(|route| route.segments.iter())
            .map(|segment| parse_leading_int(&segment.equipment.transit_time))
            .sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_remove_option() {
        let quote = Quote::new(FreightType::Direct);
        let quote = add_option(&quote);
        assert_eq!(quote.options.len(), 2);
        let quote = remove_option(&quote, 1);
        assert_eq!(quote.options.len(), 1);
    }

    #[test]
    fn test_remove_last_option_is_noop() {
        let quote = Quote::new(FreightType::Direct);
        let after = remove_option(&quote, 0);
        assert_eq!(after.options, quote.options);
    }

    #[test]
    fn test_multimodal_new_option_is_weight_based() {
        let quote = Quote::new(FreightType::Multimodal);
        let quote = add_option(&quote);
        let QuoteOptions::Routes(routes) = &quote.options else {
            panic!("multimodal quote carries routes");
        };
        assert_eq!(
            routes[1].segments[0].charges.freight[0].basis,
            crate::document::ChargeBasis::PerWeight
        );
    }

    #[test]
    fn test_add_and_remove_segment() {
        let quote = Quote::new(FreightType::Transit);
        let quote = add_segment(&quote, 0);
        let QuoteOptions::Routes(routes) = &quote.options else {
            panic!("transit quote carries routes");
        };
        assert_eq!(routes[0].segments.len(), 2);

        let quote = remove_segment(&quote, 0, 1);
        let QuoteOptions::Routes(routes) = &quote.options else {
            panic!("transit quote carries routes");
        };
        assert_eq!(routes[0].segments.len(), 1);
    }

    #[test]
    fn test_remove_last_segment_is_noop() {
        let quote = Quote::new(FreightType::Transit);
        let after = remove_segment(&quote, 0, 0);
        assert_eq!(after.options, quote.options);
    }

    #[test]
    fn test_add_segment_on_direct_quote_is_noop() {
        let quote = Quote::new(FreightType::Direct);
        let after = add_segment(&quote, 0);
        assert_eq!(after.options, quote.options);
    }

    #[test]
    fn test_add_and_remove_table() {
        let set = ChargeSet::new();
        let set = add_table(&set, ChargeSection::Destination);
        assert_eq!(set.destination.len(), 2);
        let set = remove_table(&set, ChargeSection::Destination, 1);
        assert_eq!(set.destination.len(), 1);
    }

    #[test]
    fn test_remove_default_table_is_always_noop() {
        let set = ChargeSet::new();
        // single-table collection
        let after = remove_table(&set, ChargeSection::Freight, 0);
        assert_eq!(after, set);
        // multi-table collection: index 0 still protected
        let set = add_table(&set, ChargeSection::Freight);
        let after = remove_table(&set, ChargeSection::Freight, 0);
        assert_eq!(after, set);
        assert_eq!(after.freight.len(), 2);
    }

    #[test]
    fn test_added_table_inherits_basis() {
        let mut set = ChargeSet::weight_based();
        set = add_table(&set, ChargeSection::Freight);
        assert_eq!(
            set.freight[1].basis,
            crate::document::ChargeBasis::PerWeight
        );
    }

    #[test]
    fn test_total_transit_time_lenient_parse() {
        // Spec scenario: ["3", "", "abc", "5"] -> 8
        let mut quote = Quote::new(FreightType::Transit);
        let QuoteOptions::Routes(ref mut routes) = quote.options else {
            panic!("transit quote carries routes");
        };
        let times = ["3", "", "abc", "5"];
        routes[0].segments = times
            .iter()
            .map(|t| {
                let mut segment = RouteSegment::new();
                segment.equipment.transit_time = t.to_string();
                segment
            })
            .collect();
        assert_eq!(total_transit_time(&quote), 8);
    }

    #[test]
    fn test_total_transit_time_zero_for_direct() {
        let quote = Quote::new(FreightType::Direct);
        assert_eq!(total_transit_time(&quote), 0);
    }
}
