//! Clinic agenda engine: appointment normalization, conflict detection,
//! calendar projections and the booking workflow, plus the HTTP gateway
//! routes a dashboard calls into.

pub mod auth;
pub mod backend;
pub mod config;
pub mod conflict;
pub mod error;
pub mod middleware;
pub mod models;
pub mod normalize;
pub mod projector;
pub mod routes;
pub mod session;
pub mod time;
pub mod workflow;
