//! Flight footprint from great-circle distance between two airports.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use strum::{Display, EnumString};

use super::round_to;
use crate::error::EcoError;
use crate::form::NOT_SPECIFIED;
use crate::tools::arguments::ToolArguments;
use crate::tools::tool::{Tool, ToolExecutionContext, ToolOutcome};

pub const TOOL_NAME: &str = "calculateFlightCarbonFootprint";

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Routing and holding-pattern correction on top of the great-circle distance.
const DISTANCE_UPLIFT: f64 = 1.09;

/// IATA code, latitude, longitude.
const AIRPORTS: &[(&str, f64, f64)] = &[
    ("AMS", 52.3105, 4.7683),
    ("ATL", 33.6407, -84.4277),
    ("BCN", 41.2974, 2.0833),
    ("BOS", 42.3656, -71.0096),
    ("CDG", 49.0097, 2.5479),
    ("DEN", 39.8561, -104.6737),
    ("DUB", 53.4264, -6.2499),
    ("DXB", 25.2532, 55.3657),
    ("FCO", 41.8003, 12.2389),
    ("FRA", 50.0379, 8.5622),
    ("GRU", -23.4356, -46.4731),
    ("HKG", 22.3080, 113.9185),
    ("HND", 35.5494, 139.7798),
    ("ICN", 37.4602, 126.4407),
    ("IST", 41.2753, 28.7519),
    ("JFK", 40.6413, -73.7781),
    ("LAX", 33.9416, -118.4085),
    ("LHR", 51.4700, -0.4543),
    ("MAD", 40.4983, -3.5676),
    ("MEX", 19.4361, -99.0719),
    ("MIA", 25.7959, -80.2870),
    ("MUC", 48.3537, 11.7750),
    ("ORD", 41.9742, -87.9073),
    ("PEK", 40.0799, 116.6031),
    ("SEA", 47.4502, -122.3088),
    ("SFO", 37.6213, -122.3790),
    ("SIN", 1.3644, 103.9915),
    ("SYD", -33.9399, 151.1753),
    ("YYZ", 43.6777, -79.6248),
    ("ZRH", 47.4582, 8.5555),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum FlightClass {
    #[default]
    #[strum(serialize = "economy")]
    Economy,
    #[strum(
        to_string = "premium economy",
        serialize = "premium_economy",
        serialize = "premium-economy",
        serialize = "premium"
    )]
    PremiumEconomy,
    #[strum(serialize = "business")]
    Business,
    #[strum(to_string = "first", serialize = "first class")]
    First,
}

impl FlightClass {
    /// kg CO2e per passenger-km.
    pub fn factor(self) -> f64 {
        match self {
            Self::Economy => 0.146,
            Self::PremiumEconomy => 0.233,
            Self::Business => 0.423,
            Self::First => 0.584,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum TravelType {
    #[default]
    #[strum(to_string = "one-way", serialize = "one way", serialize = "oneway")]
    OneWay,
    #[strum(
        to_string = "round trip",
        serialize = "round-trip",
        serialize = "roundtrip",
        serialize = "return"
    )]
    RoundTrip,
}

/// A resolved flight request.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightRequest {
    pub from: String,
    pub to: String,
    pub passengers: u32,
    pub class: FlightClass,
    pub travel_type: TravelType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlightFootprint {
    pub distance_km: f64,
    pub emissions_kg: f64,
    pub per_passenger_kg: f64,
}

impl FlightFootprint {
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "distanceKm": round_to(self.distance_km, 2),
            "emissionsKg": round_to(self.emissions_kg, 2),
            "perPassengerKg": round_to(self.per_passenger_kg, 2),
        })
    }
}

pub fn airport_coordinates(code: &str) -> Option<(f64, f64)> {
    let code = code.trim().to_ascii_uppercase();
    AIRPORTS
        .iter()
        .find(|(iata, _, _)| *iata == code)
        .map(|(_, lat, lon)| (*lat, *lon))
}

/// Great-circle distance in km.
pub fn haversine_km((lat1, lon1): (f64, f64), (lat2, lon2): (f64, f64)) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

pub fn flight_footprint(request: &FlightRequest) -> Result<FlightFootprint, EcoError> {
    let origin = airport_coordinates(&request.from)
        .ok_or_else(|| EcoError::InvalidArgument(format!("Unknown airport: {}", request.from)))?;
    let destination = airport_coordinates(&request.to)
        .ok_or_else(|| EcoError::InvalidArgument(format!("Unknown airport: {}", request.to)))?;

    let legs = match request.travel_type {
        TravelType::OneWay => 1.0,
        TravelType::RoundTrip => 2.0,
    };
    let distance_km = haversine_km(origin, destination) * DISTANCE_UPLIFT * legs;
    let per_passenger_kg = distance_km * request.class.factor();

    Ok(FlightFootprint {
        distance_km,
        emissions_kg: per_passenger_kg * f64::from(request.passengers),
        per_passenger_kg,
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFlightArgs {
    initial_airport: String,
    final_airport: String,
    #[serde(default)]
    number_of_passengers: Option<Value>,
    #[serde(default)]
    flight_class: Option<String>,
    #[serde(default)]
    travel_type: Option<String>,
}

impl FlightRequest {
    pub fn from_args(args: &ToolArguments) -> Result<Self, EcoError> {
        let raw: RawFlightArgs = args.deserialize()?;
        Ok(Self {
            from: raw.initial_airport,
            to: raw.final_airport,
            passengers: parse_passengers(raw.number_of_passengers.as_ref())?,
            class: parse_or_default(raw.flight_class.as_deref(), "flightClass")?,
            travel_type: parse_or_default(raw.travel_type.as_deref(), "travelType")?,
        })
    }
}

fn is_unspecified(text: &str) -> bool {
    let text = text.trim();
    text.is_empty() || text.eq_ignore_ascii_case(NOT_SPECIFIED)
}

fn parse_or_default<T>(value: Option<&str>, field: &str) -> Result<T, EcoError>
where
    T: Default + std::str::FromStr,
{
    match value {
        Some(text) if !is_unspecified(text) => text
            .trim()
            .parse()
            .map_err(|_| EcoError::InvalidArgument(format!("Unsupported {field}: {text}"))),
        _ => Ok(T::default()),
    }
}

fn parse_passengers(value: Option<&Value>) -> Result<u32, EcoError> {
    let invalid = || EcoError::InvalidArgument("numberOfPassengers must be a positive integer".into());
    let count = match value {
        None | Some(Value::Null) => return Ok(1),
        Some(Value::String(text)) if is_unspecified(text) => return Ok(1),
        Some(Value::String(text)) => text.trim().parse::<u32>().map_err(|_| invalid())?,
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(invalid)?,
        Some(_) => return Err(invalid()),
    };
    if count == 0 {
        return Err(invalid());
    }
    Ok(count)
}

pub struct FlightFootprintTool;

#[async_trait]
impl Tool for FlightFootprintTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Estimate the carbon footprint (kg CO2e) of a flight between two IATA airports"
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        _ctx: &ToolExecutionContext,
    ) -> Result<ToolOutcome, EcoError> {
        let request = FlightRequest::from_args(args)?;
        let footprint = flight_footprint(&request)?;
        Ok(footprint.to_json().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(from: &str, to: &str) -> FlightRequest {
        FlightRequest {
            from: from.into(),
            to: to.into(),
            passengers: 1,
            class: FlightClass::Economy,
            travel_type: TravelType::OneWay,
        }
    }

    #[test]
    fn london_to_new_york_distance() {
        let km = haversine_km(
            airport_coordinates("LHR").unwrap(),
            airport_coordinates("jfk").unwrap(),
        );
        assert!((5500.0..5600.0).contains(&km), "got {km}");
    }

    #[test]
    fn round_trip_doubles_and_passengers_multiply() {
        let one_way = flight_footprint(&request("LHR", "JFK")).unwrap();

        let mut round = request("LHR", "JFK");
        round.travel_type = TravelType::RoundTrip;
        round.passengers = 3;
        let round = flight_footprint(&round).unwrap();

        assert!((round.per_passenger_kg - 2.0 * one_way.per_passenger_kg).abs() < 1e-9);
        assert!((round.emissions_kg - 3.0 * round.per_passenger_kg).abs() < 1e-9);
    }

    #[test]
    fn cabin_class_orders_footprint() {
        let mut business = request("CDG", "SIN");
        business.class = FlightClass::Business;
        let economy = flight_footprint(&request("CDG", "SIN")).unwrap();
        let business = flight_footprint(&business).unwrap();
        assert!(business.emissions_kg > economy.emissions_kg);
    }

    #[test]
    fn unknown_airport_is_an_argument_error() {
        let err = flight_footprint(&request("LHR", "XXX")).unwrap_err();
        assert!(matches!(err, EcoError::InvalidArgument(msg) if msg.contains("XXX")));
    }

    #[test]
    fn args_fall_back_to_defaults() {
        let args = ToolArguments::new(serde_json::json!({
            "initialAirport": "LHR",
            "finalAirport": "JFK",
            "numberOfPassengers": "not specified",
            "flightClass": "Premium Economy",
            "travelType": "round trip"
        }));
        let request = FlightRequest::from_args(&args).unwrap();
        assert_eq!(request.passengers, 1);
        assert_eq!(request.class, FlightClass::PremiumEconomy);
        assert_eq!(request.travel_type, TravelType::RoundTrip);

        let zero = ToolArguments::new(serde_json::json!({
            "initialAirport": "LHR", "finalAirport": "JFK", "numberOfPassengers": 0
        }));
        assert!(FlightRequest::from_args(&zero).is_err());
    }

    #[tokio::test]
    async fn tool_reports_rounded_figures() {
        let outcome = FlightFootprintTool
            .execute(
                &ToolArguments::new(serde_json::json!({
                    "initialAirport": "LHR",
                    "finalAirport": "JFK",
                    "numberOfPassengers": 2
                })),
                &ToolExecutionContext::default(),
            )
            .await
            .unwrap();

        let per = outcome.value["perPassengerKg"].as_f64().unwrap();
        let total = outcome.value["emissionsKg"].as_f64().unwrap();
        assert!((total - 2.0 * per).abs() < 0.02);
        assert_eq!(per, round_to(per, 2));
    }
}
