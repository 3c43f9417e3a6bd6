// Library exports so integration tests can drive the app without HTTP.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod forms;
pub mod routes;
pub mod state;
pub mod store;
