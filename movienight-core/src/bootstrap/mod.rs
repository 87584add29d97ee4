//! Startup wiring for the MovieNight server
//!
//! Loads configuration, then builds the shared chat services from it.

pub mod config;
pub mod services;

pub use config::load_config;
pub use services::init_services;
