//! depman-registry - In-memory service registry
//!
//! This crate provides [`InMemoryRegistry`], a thread-safe implementation of
//! [`ServiceRegistry`](depman_core::ServiceRegistry) that hosts and tests can
//! use as the registry collaborator of the lifecycle engine.

mod memory;

pub use memory::InMemoryRegistry;
