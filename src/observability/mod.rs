//! Observability infrastructure.
//!
//! The library only emits `tracing` events; binaries and tests install a
//! subscriber through [`tracing::init_tracing`] or one of its variants.

pub mod tracing;
