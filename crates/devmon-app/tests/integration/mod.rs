//! Integration tests for devmon-app.
//!
//! These tests exercise the components together:
//! - Feed connection lifecycle against an in-process hub
//! - Invocation parsing into the device store
//! - Store publication to readers

#![allow(dead_code)]

pub mod common;
