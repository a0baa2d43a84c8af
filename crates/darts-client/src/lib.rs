//! Client-side turn synchronization for two-player 501 darts.
//!
//! [`controller::SyncController`] is the sans-IO core; [`web::WebSession`]
//! drives it from the browser, and native hosts drive it directly.

pub mod bridge;
pub mod clock;
pub mod config;
pub mod controller;
mod diag;
pub mod input_gate;
pub mod net_client;
pub mod reconnect;
pub mod session;
pub mod timers;
pub mod view;
pub mod web;

use wasm_bindgen::prelude::*;

/// WASM entry point.
#[wasm_bindgen(start)]
pub fn start() {
    #[cfg(target_family = "wasm")]
    console_error_panic_hook::set_once();
}
