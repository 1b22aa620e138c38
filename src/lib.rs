pub mod buffer;
pub mod config;
pub mod errors;
pub mod estimators;
pub mod filters;
pub mod processing;
pub mod stream;
pub mod transport;
pub mod utils;

#[cfg(feature = "python")]
pub mod bindings;
