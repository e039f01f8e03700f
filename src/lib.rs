//! georouter - geo-aware routing and regional client resolution
//!
//! Resolves a caller's IP to a country, classifies it into a [`geo::Region`],
//! and uses that to redirect designated-region traffic to an alternate
//! deployment and to pick region-appropriate backends.
//!
//! # Features
//! - **server**: HTTP edge (region router, detect API, health)
//! - **cli**: Command-line interface
//!
//! # Architecture
//! - `geo`: classification and the resolved record
//! - `cache`: server-tier and client-tier geo caches
//! - `services`: upstream lookup with retry, the resolution service
//! - `api`: HTTP middleware and handlers
//! - `client`: detect API client with a persisted cache
//! - `config`: Configuration management
//! - `runtime`: Application lifecycle and execution modes
//! - `system`: logging setup

pub mod api;
pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod errors;
pub mod geo;
pub mod interfaces;
pub mod runtime;
pub mod services;
pub mod system;
pub mod utils;
