use anyhow::Result;

use crate::planner::RescuePlan;
use crate::reporters::traits::Reporter;

/// The plan artifact: pretty JSON with a trailing newline. Summary maps are
/// ordered, so identical input yields identical bytes.
pub struct JsonReporter;

impl Reporter for JsonReporter {
    fn name(&self) -> &str {
        "JSON"
    }

    fn generate(&self, plan: &RescuePlan) -> Result<String> {
        let mut output = serde_json::to_string_pretty(plan)?;
        output.push('\n');
        Ok(output)
    }
}
