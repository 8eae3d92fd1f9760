// Search service: the inbound surface a transport layer holds on to.
// Answers flight queries from an injected catalog and builds calendar
// payloads for individual flights.

use crate::calendar::{CalendarConfig, CalendarError, CalendarEvent, CalendarEventBuilder};
use crate::catalog::FlightCatalog;
use crate::flight::FlightRecord;
use crate::matcher::{normalize_query, QueryMatcher};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Flight not found: {0}")]
    FlightNotFound(String),

    #[error("Calendar error: {0}")]
    Calendar(#[from] CalendarError),
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    // Artificial delay applied to every search
    pub latency: Duration,
    // Extra random delay in [0, latency_jitter) drawn per call
    pub latency_jitter: Duration,
    pub calendar: CalendarConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(500),
            latency_jitter: Duration::ZERO,
            calendar: CalendarConfig::default(),
        }
    }
}

impl ServiceConfig {
    // No artificial latency, for tests and embedding
    pub fn immediate() -> Self {
        Self {
            latency: Duration::ZERO,
            ..Default::default()
        }
    }
}

// Response body of the flights query: `{ "flights": [...] }`
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct FlightsResponse {
    pub flights: Vec<FlightRecord>,
}

#[derive(Debug, Default)]
pub struct SearchStats {
    pub searches: AtomicUsize,
    pub blank_queries: AtomicUsize,
    pub empty_results: AtomicUsize,
    pub flights_returned: AtomicUsize,
    pub events_built: AtomicUsize,
    pub event_failures: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct SearchStatsReport {
    pub searches: usize,
    pub blank_queries: usize,
    pub empty_results: usize,
    pub flights_returned: usize,
    pub events_built: usize,
    pub event_failures: usize,
}

#[async_trait]
pub trait FlightLookup: Send + Sync + 'static {
    // Matching flights in catalog order; never fails
    async fn search(&self, query: &str) -> Vec<FlightRecord>;

    // Inbound query parameter, possibly absent
    async fn respond(&self, query: Option<&str>) -> FlightsResponse {
        FlightsResponse {
            flights: self.search(query.unwrap_or_default()).await,
        }
    }

    fn calendar_event(&self, flight_id: &str) -> Result<CalendarEvent, ServiceError>;

    fn calendar_link(&self, flight_id: &str) -> Result<String, ServiceError>;

    fn stats(&self) -> SearchStatsReport;
}

pub struct SearchService {
    catalog: Arc<FlightCatalog>,
    matcher: QueryMatcher,
    events: CalendarEventBuilder,
    config: ServiceConfig,
    stats: SearchStats,
}

impl SearchService {
    pub fn new(catalog: Arc<FlightCatalog>, config: ServiceConfig) -> Result<Self, ServiceError> {
        let events = CalendarEventBuilder::new(config.calendar.clone())?;

        Ok(Self {
            catalog,
            matcher: QueryMatcher::new(),
            events,
            config,
            stats: SearchStats::default(),
        })
    }

    pub fn catalog(&self) -> &FlightCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    // Every call sleeps on its own timer; concurrent searches overlap
    async fn simulate_latency(&self) {
        let jitter_ms = self.config.latency_jitter.as_millis() as u64;
        let jitter = if jitter_ms > 0 {
            Duration::from_millis(rand::random::<u64>() % jitter_ms)
        } else {
            Duration::ZERO
        };

        let delay = self.config.latency + jitter;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    fn record_search(&self, query: &str, results: &[FlightRecord]) {
        self.stats.searches.fetch_add(1, Ordering::SeqCst);
        if normalize_query(query).is_none() {
            self.stats.blank_queries.fetch_add(1, Ordering::SeqCst);
        }
        if results.is_empty() {
            self.stats.empty_results.fetch_add(1, Ordering::SeqCst);
        }
        self.stats
            .flights_returned
            .fetch_add(results.len(), Ordering::SeqCst);
    }
}

#[async_trait]
impl FlightLookup for SearchService {
    async fn search(&self, query: &str) -> Vec<FlightRecord> {
        self.simulate_latency().await;

        let results = self.matcher.filter(self.catalog.flights(), query);
        self.record_search(query, &results);

        debug!(query = query, matches = results.len(), "Flight search");
        results
    }

    fn calendar_event(&self, flight_id: &str) -> Result<CalendarEvent, ServiceError> {
        let flight = self
            .catalog
            .get(flight_id)
            .ok_or_else(|| ServiceError::FlightNotFound(flight_id.to_string()))?;

        match self.events.build(flight) {
            Ok(event) => {
                self.stats.events_built.fetch_add(1, Ordering::SeqCst);
                Ok(event)
            }
            Err(e) => {
                self.stats.event_failures.fetch_add(1, Ordering::SeqCst);
                warn!(flight = %flight.flight_number, error = %e, "Calendar event build failed");
                Err(e.into())
            }
        }
    }

    fn calendar_link(&self, flight_id: &str) -> Result<String, ServiceError> {
        let event = self.calendar_event(flight_id)?;
        Ok(self.events.calendar_url(&event))
    }

    fn stats(&self) -> SearchStatsReport {
        SearchStatsReport {
            searches: self.stats.searches.load(Ordering::SeqCst),
            blank_queries: self.stats.blank_queries.load(Ordering::SeqCst),
            empty_results: self.stats.empty_results.load(Ordering::SeqCst),
            flights_returned: self.stats.flights_returned.load(Ordering::SeqCst),
            events_built: self.stats.events_built.load(Ordering::SeqCst),
            event_failures: self.stats.event_failures.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::DEFAULT_CALENDAR_BASE_URL;
    use crate::flight::fixtures::flight;
    use std::time::Instant;
    use tokio_test::{assert_err, assert_ok};

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("flight_lookup=debug")
            .with_test_writer()
            .try_init();
    }

    fn seed_service(config: ServiceConfig) -> SearchService {
        let catalog = Arc::new(FlightCatalog::seed().unwrap());
        SearchService::new(catalog, config).unwrap()
    }

    fn numbers(flights: &[FlightRecord]) -> Vec<&str> {
        flights.iter().map(|f| f.flight_number.as_str()).collect()
    }

    #[tokio::test]
    async fn test_search_scenarios() {
        init_tracing();
        let service = seed_service(ServiceConfig::immediate());

        assert_eq!(numbers(&service.search("AA1").await), vec!["AA100"]);
        assert_eq!(numbers(&service.search("delta").await), vec!["DL300"]);
        assert!(service.search("ZZ999").await.is_empty());
        assert!(service.search("").await.is_empty());
    }

    #[tokio::test]
    async fn test_search_is_idempotent() {
        let service = seed_service(ServiceConfig::immediate());

        let first = service.search("air").await;
        let second = service.search("air").await;
        assert_eq!(first, second);
        assert_eq!(numbers(&first), vec!["AA100", "UA200", "DL300", "BA456"]);
    }

    #[tokio::test]
    async fn test_respond_absent_and_blank_query() {
        let service = seed_service(ServiceConfig::immediate());

        assert_eq!(service.respond(None).await, FlightsResponse::default());
        assert!(service.respond(Some("  ")).await.flights.is_empty());

        let body = serde_json::to_string(&service.respond(None).await).unwrap();
        assert_eq!(body, r#"{"flights":[]}"#);
    }

    #[tokio::test]
    async fn test_respond_json_shape() {
        let service = seed_service(ServiceConfig::immediate());

        let response = service.respond(Some("emirates")).await;
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["flights"].as_array().unwrap().len(), 1);
        assert_eq!(json["flights"][0]["flightNumber"], "EK789");
        assert_eq!(json["flights"][0]["arrival"]["city"], "Sydney");
    }

    #[tokio::test]
    async fn test_injected_catalog() {
        let catalog = FlightCatalog::new(vec![
            flight("x1", "QF1", "Qantas"),
            flight("x2", "QR2", "Qatar Airways"),
        ])
        .unwrap();
        let service = SearchService::new(Arc::new(catalog), ServiceConfig::immediate()).unwrap();

        assert_eq!(numbers(&service.search("q").await), vec!["QF1", "QR2"]);
        assert!(service.search("AA100").await.is_empty());
        assert_eq!(service.catalog().len(), 2);
    }

    #[tokio::test]
    async fn test_latency_is_applied() {
        let config = ServiceConfig {
            latency: Duration::from_millis(100),
            ..ServiceConfig::immediate()
        };
        let service = seed_service(config);
        assert_eq!(service.config().latency, Duration::from_millis(100));

        let started = Instant::now();
        let results = service.search("UA").await;
        assert!(started.elapsed() >= Duration::from_millis(100));
        assert_eq!(numbers(&results), vec!["UA200"]);
    }

    #[tokio::test]
    async fn test_concurrent_searches_do_not_serialize_delay() {
        let config = ServiceConfig {
            latency: Duration::from_millis(200),
            latency_jitter: Duration::from_millis(20),
            ..ServiceConfig::immediate()
        };
        let service = Arc::new(seed_service(config));

        let started = Instant::now();
        let queries = ["AA", "UA", "DL", "BA", "EK", "air", "zz", ""];
        let results = futures::future::join_all(queries.iter().map(|q| {
            let service = Arc::clone(&service);
            async move { service.search(q).await }
        }))
        .await;
        let elapsed = started.elapsed();

        // Eight sequential delays would take at least 1.6s
        assert!(elapsed < Duration::from_millis(1000), "took {:?}", elapsed);
        assert_eq!(results.len(), queries.len());
        assert_eq!(numbers(&results[0]), vec!["AA100"]);
        assert!(results[6].is_empty());
        assert!(results[7].is_empty());
        assert_eq!(service.stats().searches, queries.len());
    }

    #[tokio::test]
    async fn test_spawned_searches_share_service() {
        let service = Arc::new(seed_service(ServiceConfig::immediate()));

        let mut handles = vec![];
        for _ in 0..16 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move { service.search("lines").await }));
        }

        for handle in handles {
            let results = handle.await.unwrap();
            assert_eq!(numbers(&results), vec!["AA100", "UA200", "DL300"]);
        }
        assert_eq!(service.stats().flights_returned, 16 * 3);
    }

    #[test]
    fn test_calendar_event_by_id() {
        let service = seed_service(ServiceConfig::immediate());

        let event = assert_ok!(service.calendar_event("1"));
        assert_eq!(event.title, "Flight AA100 - American Airlines");
        assert_eq!(event.location, "JFK → LAX");

        let err = assert_err!(service.calendar_event("99"));
        assert!(matches!(err, ServiceError::FlightNotFound(id) if id == "99"));
    }

    #[test]
    fn test_calendar_link_by_id() {
        let service = seed_service(ServiceConfig::immediate());

        let link = assert_ok!(service.calendar_link("3"));
        assert!(link.starts_with(DEFAULT_CALENDAR_BASE_URL));
        assert!(link.contains("action=TEMPLATE"));
        assert!(link.contains("text=Flight+DL300+-+Delta+Air+Lines"));
        assert!(link.contains("dates=20251203T153000Z%2F20251204T001500Z"));
        assert!(link.contains("location=ATL+%E2%86%92+CDG"));
    }

    #[test]
    fn test_calendar_failure_surfaces() {
        let mut broken = flight("b1", "ZZ1", "Broken Air");
        broken.departure.time = "2025-12-03 8am".to_string();
        let catalog = FlightCatalog::new(vec![broken]).unwrap();
        let service = SearchService::new(Arc::new(catalog), ServiceConfig::immediate()).unwrap();

        let err = assert_err!(service.calendar_link("b1"));
        assert!(matches!(
            err,
            ServiceError::Calendar(CalendarError::MalformedTimestamp { field: "departure", .. })
        ));

        let stats = service.stats();
        assert_eq!(stats.event_failures, 1);
        assert_eq!(stats.events_built, 0);
    }

    #[test]
    fn test_invalid_calendar_config() {
        let config = ServiceConfig {
            calendar: CalendarConfig {
                base_url: "::".to_string(),
                ..Default::default()
            },
            ..ServiceConfig::immediate()
        };
        let result = SearchService::new(Arc::new(FlightCatalog::default()), config);
        assert!(matches!(
            result,
            Err(ServiceError::Calendar(CalendarError::InvalidBaseUrl(_)))
        ));
    }

    #[tokio::test]
    async fn test_stats_tracking() {
        let service = seed_service(ServiceConfig::immediate());

        service.search("AA").await;
        service.search("").await;
        service.search("nothing here").await;
        service.search(" \t\n").await;
        service.respond(None).await;
        let _ = service.calendar_event("2");

        let stats = service.stats();
        assert_eq!(
            stats,
            SearchStatsReport {
                searches: 5,
                blank_queries: 3,
                empty_results: 4,
                flights_returned: 1,
                events_built: 1,
                event_failures: 0,
            }
        );
    }

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.latency, Duration::from_millis(500));
        assert_eq!(config.latency_jitter, Duration::ZERO);
        assert_eq!(config.calendar.base_url, DEFAULT_CALENDAR_BASE_URL);
        assert!(ServiceConfig::immediate().latency.is_zero());
    }
}
