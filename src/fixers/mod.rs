pub mod dead_code;
pub mod driver;
pub mod mutable_default;
pub mod python;
pub mod registry;
pub mod traits;

pub use registry::default_registry;
