//! Axon Hub - HTTP transport to a single hub gateway
//!
//! This crate performs the actual request/response exchanges against one
//! hub: the liveness probe, full attribute fetches, attribute writes, and
//! the module directory listing consumed by the resolver.

pub mod client;
pub mod wire;

pub use client::{HubConnection, TransportError, DEFAULT_TIMEOUT_MS};
pub use wire::{FunctionRecord, HubInfo, ModuleRecord};
