//! # Node Runtime
//!
//! Wiring for an in-process settlement cluster: N replica handles routed
//! through the host mediator, driven by one cooperative loop per node.
//! The binary runs the demo; the harness is shared with the workspace
//! test suite.

pub mod harness;

pub use harness::ClusterHarness;
