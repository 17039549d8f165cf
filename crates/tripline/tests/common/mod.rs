//! Shared test utilities for tripline integration tests.
//!
//! This module provides:
//! - `Upstream`, a throwaway git repository playing the tracked remote
//! - Recording doubles for the executor and notifier seams

pub mod harness;
pub mod recording;

#[allow(unused_imports)]
pub use harness::{git, Upstream};
#[allow(unused_imports)]
pub use recording::{RecordingExecutor, RecordingNotifier};
