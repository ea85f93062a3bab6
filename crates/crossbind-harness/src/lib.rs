//! Deterministic in-memory native host for bridge tests.
//!
//! [`TestHost`] implements the full
//! [`NativeChannel`](crossbind_bridge::NativeChannel) over an
//! in-memory object space and records every verb it serves, so tests
//! can assert exactly how many native calls an operation cost. It
//! ships the behaviors of the `com.example.test` plugin: `echo` with
//! its scripted failure mode, `echoData` field-value pass-through, and
//! instance plus static events raised back through the bridge's
//! dispatcher.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod host;

pub use host::{CallRecord, TestHost, test_registry};

/// Qualified name of the scripted methods type.
pub const TEST_METHODS: &str = "com.example.test.TestMethods";
/// Qualified name of the scripted by-value struct type.
pub const TEST_STRUCT: &str = "com.example.test.TestStruct";
/// Qualified name of the scripted events type.
pub const TEST_EVENTS: &str = "com.example.test.TestEvents";
/// Qualified name of the scripted enum type.
pub const TEST_ENUM: &str = "com.example.test.TestEnum";
