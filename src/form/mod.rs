//! Structured travel-field extraction.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EcoError;
use crate::provider::ChatProvider;
use crate::types::ConversationMessage;

/// Placeholder for a field the user did not mention.
pub const NOT_SPECIFIED: &str = "not specified";

/// Wire names of the travel form fields.
pub const FIELDS: [&str; 5] = [
    "travelType",
    "initialAirport",
    "finalAirport",
    "numberOfPassengers",
    "flightClass",
];

const EXTRACTION_PROMPT: &str = "You extract flight details from a traveller's message. \
Reply with a JSON object with exactly these string fields: travelType (\"one-way\" or \
\"round trip\"), initialAirport (IATA code), finalAirport (IATA code), numberOfPassengers, \
flightClass (economy, premium economy, business or first). Use \"not specified\" for any \
field the message does not state.";

/// Travel fields as returned by `/form`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelForm {
    pub travel_type: String,
    pub initial_airport: String,
    pub final_airport: String,
    pub number_of_passengers: String,
    pub flight_class: String,
}

impl Default for TravelForm {
    fn default() -> Self {
        Self {
            travel_type: NOT_SPECIFIED.to_string(),
            initial_airport: NOT_SPECIFIED.to_string(),
            final_airport: NOT_SPECIFIED.to_string(),
            number_of_passengers: NOT_SPECIFIED.to_string(),
            flight_class: NOT_SPECIFIED.to_string(),
        }
    }
}

impl TravelForm {
    /// Build a form from loosely-typed JSON; anything unusable is "not specified".
    pub fn from_value(value: &serde_json::Value) -> Self {
        let field = |key: &str| field_text(value.get(key)).unwrap_or_else(|| NOT_SPECIFIED.to_string());
        Self {
            travel_type: field("travelType"),
            initial_airport: field("initialAirport"),
            final_airport: field("finalAirport"),
            number_of_passengers: field("numberOfPassengers"),
            flight_class: field("flightClass"),
        }
    }
}

/// Render one form value as text, or `None` if it is absent or unusable.
pub fn field_text(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Ask the provider to pull the travel fields out of `message`.
pub async fn extract_travel_form(
    provider: &dyn ChatProvider,
    model: &str,
    message: &str,
) -> Result<TravelForm, EcoError> {
    let messages = [
        ConversationMessage::system(EXTRACTION_PROMPT),
        ConversationMessage::user(message),
    ];
    let value = provider.complete_json(model, &messages).await?;
    debug!(model, "extracted travel form");
    Ok(TravelForm::from_value(&value))
}
