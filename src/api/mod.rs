//! HTTP API server

pub mod auth;
pub mod contracts;
pub mod groups;
pub mod roster;
pub mod routes;
pub mod server;
pub mod users;

pub use server::*;
