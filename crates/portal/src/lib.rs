//! Agente Cidadão portal library.
//!
//! Administrative backend for the portal: session login, administrator-only
//! account management, system settings with a restricted-access mode, the
//! HTML page server and the webhook relay.
//!
//! The router is built by [`routes::app`] over injected stores, so the
//! binary runs it on Postgres and the integration tests on in-memory stores.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod bootstrap;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
