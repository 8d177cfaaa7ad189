//! Water Monitor - live water-quality dashboard backed by Supabase
//!
//! This library exposes the core modules for testing and reuse.

pub mod backend;
pub mod common;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod routes;
pub mod session;
