//! `webbrief` crate (library surface).
//!
//! The primary entrypoint for end users is the `webbrief` binary. The query
//! loop lives here so it can be driven with in-memory input/output and stub
//! backends.

pub mod agent;
pub mod envfile;
pub mod logging;

pub use webbrief_core as core;
