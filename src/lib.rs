// Flight lookup: free-text flight search over a static catalog, plus
// calendar event payloads derived from individual flights.

pub mod calendar;
pub mod catalog;
pub mod flight;
pub mod matcher;
pub mod service;

// Re-export key types for convenience
pub use calendar::{
    CalendarConfig, CalendarError, CalendarEvent, CalendarEventBuilder, TimeBasis,
    DEFAULT_CALENDAR_BASE_URL,
};
pub use catalog::{CatalogError, FlightCatalog};
pub use flight::{FlightRecord, LegEndpoint};
pub use matcher::QueryMatcher;
pub use service::{
    FlightLookup, FlightsResponse, SearchService, SearchStatsReport, ServiceConfig, ServiceError,
};
