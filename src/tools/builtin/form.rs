//! Lets the assistant fill in the caller's travel form.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::EcoError;
use crate::form::{field_text, FIELDS};
use crate::tools::arguments::ToolArguments;
use crate::tools::tool::{Tool, ToolExecutionContext, ToolOutcome};

pub const TOOL_NAME: &str = "updateTravelForm";

/// Returns a confirmation to the model and hands the provided fields to the
/// HTTP caller as `formData`.
pub struct TravelFormTool;

#[async_trait]
impl Tool for TravelFormTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Update the user's travel form with any flight details mentioned in the conversation"
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<ToolOutcome, EcoError> {
        let object = args.as_object()?;
        let fields: Map<String, Value> = FIELDS
            .iter()
            .filter_map(|&name| field_text(object.get(name)).map(|text| (name.to_string(), Value::String(text))))
            .collect();

        if fields.is_empty() {
            return Err(EcoError::InvalidArgument(format!(
                "Expected at least one of: {}",
                FIELDS.join(", ")
            )));
        }

        debug!(
            thread = ?ctx.thread_id,
            invocation_id = ?ctx.tool_call_id,
            fields = fields.len(),
            "travel form updated"
        );
        Ok(ToolOutcome::from(serde_json::json!({ "status": "Form updated" }))
            .with_side_payload(Value::Object(fields)))
    }
}
