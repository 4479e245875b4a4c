//! Testing utilities for Seawall servers.

mod scenario;

pub use scenario::{Scenario, ScenarioAssert, get, post};
