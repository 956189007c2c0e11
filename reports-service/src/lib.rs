//! Reports Service - paginated, filterable sales reports over HTTP.

pub mod config;
pub mod handlers;
pub mod hooks;
pub mod links;
pub mod models;
pub mod params;
pub mod reports;
pub mod schema;
pub mod services;
pub mod startup;

pub use startup::{AppState, Application};
