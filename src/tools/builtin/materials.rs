//! Embodied-carbon estimate for common construction materials.

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::round_to;
use crate::error::EcoError;
use crate::tools::arguments::ToolArguments;
use crate::tools::tool::{Tool, ToolExecutionContext, ToolOutcome};

pub const TOOL_NAME: &str = "calculateCarbonEmissionsForAllCommonMaterials";

/// kg CO2e per kg of material.
pub const MATERIAL_FACTORS: &[(&str, f64)] = &[
    ("aluminum", 8.24),
    ("asphalt", 0.05),
    ("brick", 0.24),
    ("cement", 0.91),
    ("concrete", 0.1),
    ("copper", 2.71),
    ("glass", 0.85),
    ("plastic", 3.1),
    ("steel", 1.85),
    ("wood", 0.01),
];

pub fn emission_factor(material: &str) -> Option<f64> {
    MATERIAL_FACTORS
        .iter()
        .find(|(name, _)| *name == material)
        .map(|(_, factor)| *factor)
}

/// Per-material emissions plus a `total`, rounded to 4 decimals.
pub fn calculate_material_emissions(quantities: &Map<String, Value>) -> Result<Map<String, Value>, EcoError> {
    let mut result = Map::new();
    let mut total = 0.0;

    for (raw_name, raw_quantity) in quantities {
        let name = raw_name.trim().to_lowercase();
        let factor = emission_factor(&name)
            .ok_or_else(|| EcoError::InvalidArgument(format!("Unknown material: {raw_name}")))?;
        let quantity = raw_quantity
            .as_f64()
            .filter(|q| q.is_finite() && *q >= 0.0)
            .ok_or_else(|| {
                EcoError::InvalidArgument(format!(
                    "Quantity for {raw_name} must be a non-negative number"
                ))
            })?;

        let emissions = quantity * factor;
        total += emissions;
        result.insert(name, Value::from(round_to(emissions, 4)));
    }

    result.insert("total".to_string(), Value::from(round_to(total, 4)));
    Ok(result)
}

pub struct MaterialEmissionsTool;

#[async_trait]
impl Tool for MaterialEmissionsTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Estimate embodied carbon (kg CO2e) for quantities (kg) of common materials"
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        _ctx: &ToolExecutionContext,
    ) -> Result<ToolOutcome, EcoError> {
        let object = args.as_object()?;
        // Accept both `{concrete: 10}` and `{materials: {concrete: 10}}`.
        let quantities = match object.get("materials") {
            Some(Value::Object(inner)) if object.len() == 1 => inner,
            _ => object,
        };
        Ok(Value::Object(calculate_material_emissions(quantities)?).into())
    }
}
