pub mod fix;
pub mod plan;
