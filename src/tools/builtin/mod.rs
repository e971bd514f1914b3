//! Built-in tools the assistants are configured to call.

pub mod flight;
pub mod form;
pub mod materials;

use std::sync::Arc;

use super::tool::Tool;

pub use flight::FlightFootprintTool;
pub use form::TravelFormTool;
pub use materials::MaterialEmissionsTool;

/// Every built-in tool.
pub fn all_tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(MaterialEmissionsTool),
        Arc::new(FlightFootprintTool),
        Arc::new(TravelFormTool),
    ]
}

/// Round half away from zero to `decimals` places.
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}
