pub mod cache;
pub mod config;
pub mod demo;
pub mod metrics;
pub mod routes;
pub mod state;
pub mod telemetry;
