//! Native host for the gateway control panel.
//!
//! Implements the collaborator traits of `panel_controller` on top of a
//! tokio runtime: a websocket JSON-RPC gateway client, interval pollers, a
//! file-backed settings store, an in-memory history stack and the
//! dev-config HTTP probe. [`app::PanelApp`] wires them into a message loop.

pub mod app;
pub mod config;
pub mod dev_config;
pub mod error;
pub mod gateway;
pub mod layout;
pub mod logging;
pub mod msg;
pub mod navigation;
pub mod polling;
pub mod rpc;
pub mod scroll;
pub mod settings_store;

pub const APP_NAME: &str = "gateway-panel";

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
