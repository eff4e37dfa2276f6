pub mod config;
pub mod convert;
pub mod error;
pub mod pdf;
pub mod pipeline;
pub mod range;
pub mod transform;
