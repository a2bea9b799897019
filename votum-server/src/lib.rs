//! Network-facing ballot submission service

pub mod config;
pub mod endpoint;
pub mod http;
