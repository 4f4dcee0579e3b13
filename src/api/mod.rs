//! HTTP surface — JSON endpoints for OTP auth and the conversation agent.

pub mod routes;

pub use routes::{ApiState, api_routes};
