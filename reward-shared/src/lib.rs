//! # Reward Shared Library
//!
//! Data layer and reward rules shared by the API server and its tests.
//!
//! ## Module Organization
//!
//! - `models`: database rows and their CRUD
//! - `coordination`: transactional reward operations (ledger, status
//!   transitions, invites, ranking)
//! - `auth`: JWT utilities
//! - `db`: pool and migrations
//! - `error`: the [`RewardError`](error::RewardError) taxonomy

pub mod auth;
pub mod coordination;
pub mod db;
pub mod error;
pub mod models;

/// Current version of the reward shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
