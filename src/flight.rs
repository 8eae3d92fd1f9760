use serde::{Deserialize, Serialize};

// Flight record as served by the flights endpoint (camelCase wire names)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightRecord {
    pub id: String,
    pub flight_number: String,
    pub airline: String,
    pub departure: LegEndpoint,
    pub arrival: LegEndpoint,
    // Free-form label such as "6h 30m", display only
    pub duration: String,
    // Opaque display value ("On Time", "Boarding", "Delayed", ...)
    pub status: String,
}

// One side of a flight. `time` is a wall-clock timestamp without offset,
// `timezone` is a display label like "EST (UTC-5)".
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LegEndpoint {
    pub airport: String,
    pub city: String,
    pub country: String,
    pub time: String,
    pub timezone: String,
}

impl FlightRecord {
    // Case-insensitive substring test against flight number or airline.
    // `needle` must already be uppercased.
    pub fn matches_normalized(&self, needle: &str) -> bool {
        self.flight_number.to_uppercase().contains(needle)
            || self.airline.to_uppercase().contains(needle)
    }
}
