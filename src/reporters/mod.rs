pub mod json;
pub mod text;
pub mod traits;

pub use json::JsonReporter;
pub use text::TextReporter;
pub use traits::Reporter;
