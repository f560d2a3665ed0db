//! tronwatch - TRON account lookups with a persisted query history
//!
//! # Architecture
//!
//! The crate is organized into three layers:
//!
//! ## Network
//! - [`tron`] - TronGrid client and the derived account snapshot
//!
//! ## Persistence
//! - [`persistence`] - Query history store (SQLite, in-memory)
//!
//! ## Integration
//! - [`api`] - HTTP endpoints and request orchestration
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Network
// ============================================================================
pub mod tron;

// ============================================================================
// Persistence
// ============================================================================
pub mod persistence;

// ============================================================================
// Integration
// ============================================================================
#[cfg(feature = "api")]
pub mod api;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;

/// Install the global tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tronwatch=info,tronwatch_server=info".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
