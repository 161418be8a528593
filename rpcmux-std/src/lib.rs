//! # rpcmux-std
//!
//! Standard implementations for the rpcmux HTTP-RPC dispatch framework.
//!
//! This crate provides:
//! - **Standard hooks**: [`hooks::LoggingAfter`], [`hooks::TypedValidator`]
//! - **Testing doubles**: [`testing::MockCodec`], [`testing::RecordingHook`],
//!   [`testing::ReplaceRequest`], [`testing::CountingValidator`]

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use rpcmux_core;

// Modules
pub mod hooks;
pub mod testing;
