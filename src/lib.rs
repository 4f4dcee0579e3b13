//! Lead Scout — conversational lead qualification for real-estate buyers.

pub mod api;
pub mod auth;
pub mod channels;
pub mod config;
pub mod error;
pub mod jobs;
pub mod qualify;
pub mod store;
