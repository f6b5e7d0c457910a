//! HTTP transport for the [`holdem_rooms`] poker engine.
//!
//! A thin axum layer over [`holdem_rooms::MemoryStore`]: session middleware,
//! JSON handlers, the derived state view, static web serving, and the
//! idle-user sweeper. All game semantics live in the engine crate.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
