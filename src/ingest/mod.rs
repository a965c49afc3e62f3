pub mod loader;
pub mod model;

pub use loader::{load_run_result, RUN_RESULT_SCHEMA};
