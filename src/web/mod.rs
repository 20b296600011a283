//! Web API module for the alewife application.

pub mod batches;
pub mod error;
pub mod preferences;
pub mod routes;
pub mod status;

pub use routes::*;
