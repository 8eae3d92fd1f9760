// Flight catalog: the fixed, read-only set of flights available for search
use crate::flight::FlightRecord;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("JSON parse error: {0}")]
    JsonParseError(String),

    #[error("Duplicate flight id: {0}")]
    DuplicateId(String),

    #[error("Missing required field {field} on flight {id}")]
    MissingField { id: String, field: &'static str },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// Seed flights bundled with the crate
pub const SEED_JSON: &str = include_str!("../samples/flights.json");
pub const SEED_JSON_PATH: &str = "samples/flights.json";

#[derive(Debug, Clone, Default)]
pub struct FlightCatalog {
    flights: Vec<FlightRecord>,
}

impl FlightCatalog {
    // Build a catalog, keeping insertion order and checking the data-entry invariants
    pub fn new(flights: Vec<FlightRecord>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(flights.len());

        for flight in &flights {
            if flight.flight_number.trim().is_empty() {
                return Err(CatalogError::MissingField {
                    id: flight.id.clone(),
                    field: "flightNumber",
                });
            }
            if flight.airline.trim().is_empty() {
                return Err(CatalogError::MissingField {
                    id: flight.id.clone(),
                    field: "airline",
                });
            }
            if !seen.insert(flight.id.as_str()) {
                return Err(CatalogError::DuplicateId(flight.id.clone()));
            }
        }

        Ok(Self { flights })
    }

    pub fn seed() -> Result<Self, CatalogError> {
        Self::from_json(SEED_JSON)
    }

    pub fn from_json(json_str: &str) -> Result<Self, CatalogError> {
        let flights: Vec<FlightRecord> = serde_json::from_str(json_str)
            .map_err(|e| CatalogError::JsonParseError(e.to_string()))?;

        let catalog = Self::new(flights)?;
        info!(flights = catalog.len(), "Flight catalog loaded");
        Ok(catalog)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn flights(&self) -> &[FlightRecord] {
        &self.flights
    }

    pub fn get(&self, id: &str) -> Option<&FlightRecord> {
        self.flights.iter().find(|flight| flight.id == id)
    }

    pub fn len(&self) -> usize {
        self.flights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }
}
