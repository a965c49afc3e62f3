use anyhow::Result;

use crate::planner::RescuePlan;

pub trait Reporter: Send + Sync {
    /// Reporter name for display
    fn name(&self) -> &str;

    /// Render the plan as a string
    fn generate(&self, plan: &RescuePlan) -> Result<String>;
}
