//! Lifecycle orchestration for the gateway control panel.
//!
//! The [`controller::LifecycleController`] drives four entry points
//! (connect, first render, update, disconnect) over a set of collaborator
//! traits defined in [`collab`]. Everything with a runtime behind it lives in
//! the `gateway-panel` crate.

pub mod collab;
pub mod controller;
pub mod dev_config;
pub mod diff;
pub mod error;
pub mod location;
pub mod settings;
pub mod tab;
pub mod theme;
pub mod view;

pub use controller::{plan_scrolls, Collaborators, LifecycleController, LifecyclePhase, ScrollPlan};
pub use error::{PanelError, ProbeError};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
