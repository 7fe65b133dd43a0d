//! Academia de Líderes - user, group and contract administration
//!
//! This is the library interface for Academia, exposing the HTTP server,
//! the authentication layer and the data store.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod store;
pub mod ui;

pub use config::Config;
pub use error::Error;
