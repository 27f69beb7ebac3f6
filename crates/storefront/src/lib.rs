//! Harbor Storefront library.
//!
//! Server-rendered storefront over the external catalog API. The binary in
//! `main.rs` wires these modules into a running server; keeping them in a
//! library lets the CLI reuse the session store and API client.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
