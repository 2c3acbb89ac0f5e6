//! Integration tests for Marquee
//!
//! These tests drive whole playback sessions through the public API with the
//! fake surface and runtime from `marquee_core::testing`.

#[path = "integration/classifier_scenarios.rs"]
mod classifier_scenarios;
#[path = "integration/movie_playback.rs"]
mod movie_playback;
#[path = "integration/recovery_budget.rs"]
mod recovery_budget;
#[path = "integration/session_lifecycle.rs"]
mod session_lifecycle;
