//! Integration tests for the jarvault restore engine

mod chain_restore;
mod config_integration;
mod support;
