//! # citecheck
//!
//! Citation validation for bibliographies.
//!
//! Citations are parsed into structured sources, each source runs through a
//! fixed set of checks (URL reachability, domain credibility, recency,
//! required fields, format), and the outcomes are folded into a weighted
//! 0-100 score with a pass cutoff. Results are persisted per session with a
//! time-to-live and can be exported as JSON or CSV reports.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐   ┌──────────┐
//! │  Parser  │──▶│  Validator  │──▶│  SQLite  │
//! │ (core)   │   │ probe+score │   │ (TTL)    │
//! └──────────┘   └─────────────┘   └────┬─────┘
//!                                       │
//!                   ┌───────────────────┤
//!                   ▼                   ▼
//!              ┌──────────┐       ┌──────────┐
//!              │   CLI    │       │   HTTP   │
//!              └──────────┘       └──────────┘
//! ```
//!
//! The pure parts (models, checks, scoring, parsing, reports, the store
//! trait) live in `citecheck-core`; this crate adds configuration, SQLite
//! persistence, HTTP probing, the orchestrator, and the server.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite result store |
//! | [`probe`] | URL reachability probing |
//! | [`validate`] | Batch validation orchestrator |
//! | [`session`] | Session parsing, reports, purge |
//! | [`validate_cmd`] | CLI validate, parse, and check commands |
//! | [`server`] | HTTP server |

pub mod config;
pub mod db;
pub mod error;
pub mod migrate;
pub mod probe;
pub mod server;
pub mod session;
pub mod sqlite_store;
pub mod validate;
pub mod validate_cmd;

pub use citecheck_core as core;
