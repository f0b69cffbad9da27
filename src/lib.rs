pub mod app;
pub mod auth;
pub mod config;
mod error;
mod middleware;
mod repository;
mod routes;
mod shutdown;
mod state;
mod tracing;
