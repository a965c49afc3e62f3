pub mod action;
pub mod plan;
pub mod taxonomy;

pub use plan::{create_rescue_plan, RescuePlan, RESCUE_PLAN_SCHEMA};
pub use taxonomy::Taxonomy;
