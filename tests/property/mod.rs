//! Property-based tests for resolution and ordering guarantees

mod determinism;
