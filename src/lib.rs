#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

//! # Rank Rally Server
//!
//! Realtime coordination server for a room-based ranking party game.
//!
//! Players gather in four-letter-code rooms, take turns submitting items
//! (each decorated with an emoji), and rank every item; the room actor
//! serializes all of it and fans a consistent view out to every connected
//! client. Rooms live in memory only.

/// Configuration loading and validation
pub mod config;

/// HTTP control surface (create/join/start, snapshots, suggestions)
pub mod http;

/// Structured logging setup
pub mod logging;

/// Wire protocol: messages, snapshots, error taxonomy, validation
pub mod protocol;

/// Outbound adapters: item store and emoji service
pub mod providers;

/// Process-wide room directory and TTL eviction
pub mod registry;

/// Per-room actor, state machine, hub, timers, aggregation
pub mod room;

/// WebSocket message channel handling
pub mod websocket;
