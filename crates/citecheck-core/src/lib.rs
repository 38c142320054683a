//! # citecheck core
//!
//! Shared, I/O-free logic for citecheck: source and result models, the
//! credibility/recency/completeness checks, the weighted score aggregator,
//! the regex citation parser, the format checker, report rendering, and the
//! result store abstraction.
//!
//! This crate contains no tokio, sqlx, HTTP client, or filesystem I/O. The
//! URL reachability probe and the SQLite store live in the `citecheck`
//! runtime crate.

pub mod checks;
pub mod citation;
pub mod domain;
pub mod format;
pub mod models;
pub mod report;
pub mod score;
pub mod store;
