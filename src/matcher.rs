// Query matching: turns a free-text search term into an ordered subset of flights
use crate::flight::FlightRecord;

#[derive(Debug, Clone, Copy, Default)]
pub struct QueryMatcher;

impl QueryMatcher {
    pub fn new() -> Self {
        Self
    }

    // A blank query yields no results rather than the whole catalog.
    // Otherwise keep every flight whose number or airline contains the
    // query, case-insensitively, in catalog order.
    pub fn filter(&self, flights: &[FlightRecord], query: &str) -> Vec<FlightRecord> {
        let needle = match normalize_query(query) {
            Some(needle) => needle,
            None => return Vec::new(),
        };

        flights
            .iter()
            .filter(|flight| flight.matches_normalized(&needle))
            .cloned()
            .collect()
    }
}

// Uppercased needle, or None for empty / whitespace-only input.
// Inner and surrounding whitespace of a non-blank query is kept as typed.
pub fn normalize_query(query: &str) -> Option<String> {
    if query.trim().is_empty() {
        None
    } else {
        Some(query.to_uppercase())
    }
}
