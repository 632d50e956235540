//! Prediction Proxy
//!
//! A thin HTTP surface in front of the external inference service so browser
//! callers never hold the API credential: submit on their behalf with the
//! configured default parameters, and relay status queries by id.

pub mod server;
pub mod types;

pub use server::run_server;
