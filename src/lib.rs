//! Token Quota Server Library
//!
//! API key provisioning and quota management. This module exposes the server
//! components for embedding and testing.

pub mod app;
pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod stores;
