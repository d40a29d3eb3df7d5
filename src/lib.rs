//! Bazaar - REST backend for an e-commerce platform
//!
//! Buyers and sellers create and interact with products, reviews and
//! threaded comments. The social engagement core (voting, bookmarking,
//! threading) is storage-agnostic behind `engagement::EngagementStore`,
//! with MongoDB in production and an in-memory store in dev mode.

pub mod auth;
pub mod config;
pub mod db;
pub mod engagement;
pub mod routes;
pub mod server;
pub mod types;
