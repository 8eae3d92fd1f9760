// Calendar event derivation: maps a flight into an external calendar payload
// (title, UTC time range, description, location) and the template URL that
// carries it.
use crate::flight::{FlightRecord, LegEndpoint};
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

pub const DEFAULT_CALENDAR_BASE_URL: &str = "https://calendar.google.com/calendar/render";

// Compact UTC basic format used in the `dates` parameter
const CALENDAR_INSTANT_FORMAT: &str = "%Y%m%dT%H%M%SZ";
// en-US short form, e.g. "Dec 3, 2025, 08:00 AM"
const DISPLAY_TIME_FORMAT: &str = "%b %-d, %Y, %I:%M %p";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalendarError {
    #[error("Malformed {field} timestamp: {value:?}")]
    MalformedTimestamp { field: &'static str, value: String },

    #[error("No UTC offset in timezone label {label:?}")]
    MissingUtcOffset { label: String },

    #[error("Invalid calendar base URL: {0}")]
    InvalidBaseUrl(String),
}

// How offset-free wall-clock times are anchored to UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeBasis {
    // Read the "(UTC±H[:MM])" annotation from each leg's timezone label
    #[default]
    EndpointLabel,
    // Treat every timestamp as local time at this offset
    Fixed(FixedOffset),
}

#[derive(Debug, Clone)]
pub struct CalendarConfig {
    pub base_url: String,
    pub time_basis: TimeBasis,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CALENDAR_BASE_URL.to_string(),
            time_basis: TimeBasis::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarEvent {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub description: String,
    pub location: String,
}

impl CalendarEvent {
    // "{start}/{end}" in YYYYMMDDTHHMMSSZ
    pub fn dates(&self) -> String {
        format!(
            "{}/{}",
            format_calendar_instant(&self.start),
            format_calendar_instant(&self.end)
        )
    }
}

#[derive(Debug, Clone)]
pub struct CalendarEventBuilder {
    base_url: Url,
    time_basis: TimeBasis,
}

impl CalendarEventBuilder {
    pub fn new(config: CalendarConfig) -> Result<Self, CalendarError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| CalendarError::InvalidBaseUrl(format!("{}: {}", config.base_url, e)))?;

        Ok(Self {
            base_url,
            time_basis: config.time_basis,
        })
    }

    pub fn time_basis(&self) -> TimeBasis {
        self.time_basis
    }

    pub fn build(&self, flight: &FlightRecord) -> Result<CalendarEvent, CalendarError> {
        let departure = parse_wall_clock("departure", &flight.departure.time)?;
        let arrival = parse_wall_clock("arrival", &flight.arrival.time)?;

        let start = self.to_utc("departure", departure, &flight.departure)?;
        let end = self.to_utc("arrival", arrival, &flight.arrival)?;

        let event = CalendarEvent {
            title: format!("Flight {} - {}", flight.flight_number, flight.airline),
            start,
            end,
            description: describe(flight, &departure, &arrival),
            location: format!("{} → {}", flight.departure.airport, flight.arrival.airport),
        };

        debug!(
            flight = %flight.flight_number,
            start = %event.start,
            end = %event.end,
            "Built calendar event"
        );
        Ok(event)
    }

    // Template URL in the order action, text, dates, details, location.
    // Query values are form-encoded (space as '+'), same as URLSearchParams.
    pub fn calendar_url(&self, event: &CalendarEvent) -> String {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair("action", "TEMPLATE")
            .append_pair("text", &event.title)
            .append_pair("dates", &event.dates())
            .append_pair("details", &event.description)
            .append_pair("location", &event.location);
        url.into()
    }

    fn to_utc(
        &self,
        field: &'static str,
        local: NaiveDateTime,
        endpoint: &LegEndpoint,
    ) -> Result<DateTime<Utc>, CalendarError> {
        let offset = match self.time_basis {
            TimeBasis::Fixed(offset) => offset,
            TimeBasis::EndpointLabel => parse_utc_offset(&endpoint.timezone)?,
        };

        // A fixed offset has exactly one mapping for every wall-clock time;
        // only the edges of the representable range can fail
        let utc = local
            .checked_sub_signed(chrono::Duration::seconds(i64::from(
                offset.local_minus_utc(),
            )))
            .ok_or_else(|| CalendarError::MalformedTimestamp {
                field,
                value: endpoint.time.clone(),
            })?;
        Ok(DateTime::from_naive_utc_and_offset(utc, Utc))
    }
}

fn describe(flight: &FlightRecord, departure: &NaiveDateTime, arrival: &NaiveDateTime) -> String {
    format!(
        "Flight Details:
Airline: {airline}
Flight Number: {number}
Status: {status}

Departure: {dep_airport} - {dep_city}, {dep_country}
Departure Time: {dep_time} ({dep_tz})

Arrival: {arr_airport} - {arr_city}, {arr_country}
Arrival Time: {arr_time} ({arr_tz})

Duration: {duration}",
        airline = flight.airline,
        number = flight.flight_number,
        status = flight.status,
        dep_airport = flight.departure.airport,
        dep_city = flight.departure.city,
        dep_country = flight.departure.country,
        dep_time = format_display_time(departure),
        dep_tz = flight.departure.timezone,
        arr_airport = flight.arrival.airport,
        arr_city = flight.arrival.city,
        arr_country = flight.arrival.country,
        arr_time = format_display_time(arrival),
        arr_tz = flight.arrival.timezone,
        duration = flight.duration,
    )
}

// Offset-free ISO timestamp, seconds optional
pub fn parse_wall_clock(field: &'static str, value: &str) -> Result<NaiveDateTime, CalendarError> {
    value
        .parse::<NaiveDateTime>()
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
        .map_err(|_| CalendarError::MalformedTimestamp {
            field,
            value: value.to_string(),
        })
}

pub fn format_calendar_instant(instant: &DateTime<Utc>) -> String {
    instant.format(CALENDAR_INSTANT_FORMAT).to_string()
}

pub fn format_display_time(local: &NaiveDateTime) -> String {
    local.format(DISPLAY_TIME_FORMAT).to_string()
}

// Extract the offset from labels like "EST (UTC-5)", "IST (UTC+5:30)",
// "EST (UTC - 5)" or "UTC". Zero only when nothing but whitespace follows
// "UTC" before ')' or the end of the label.
pub fn parse_utc_offset(label: &str) -> Result<FixedOffset, CalendarError> {
    let missing = || CalendarError::MissingUtcOffset {
        label: label.to_string(),
    };

    let start = label.find("UTC").ok_or_else(missing)?;
    let annotation: String = label[start + 3..]
        .chars()
        .take_while(|c| *c != ')')
        .filter(|c| !c.is_whitespace())
        .collect();

    if annotation.is_empty() {
        return FixedOffset::east_opt(0).ok_or_else(missing);
    }

    let mut chars = annotation.chars();
    let sign = match chars.next() {
        Some('+') => 1,
        Some('-') | Some('−') => -1,
        _ => return Err(missing()),
    };
    let rest = chars.as_str();

    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None => (rest, "0"),
    };
    let hours: i32 = hours.parse().map_err(|_| missing())?;
    let minutes: i32 = minutes.parse().map_err(|_| missing())?;
    if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(missing());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(missing)
}
