//! Vetrina: a caching storefront gateway for a headless product catalog.
//!
//! The gateway sits between storefront clients and a WordPress-style
//! catalog backend. Reads are served through two cache layers (typed object
//! store and rendered-page store), writes are proxied upstream and then
//! invalidate, and a webhook round trip keeps rendered pages fresh across
//! deployments.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
