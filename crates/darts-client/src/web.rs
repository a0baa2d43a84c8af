use std::time::Duration;

use glam::DVec2;
use wasm_bindgen::prelude::*;

use darts_core::board::Viewport;

use crate::bridge::{BrowserHooks, element_viewport};
use crate::config::ClientConfig;
use crate::controller::{Intent, SyncController, ThrowAttempt};
use crate::net_client::{ChannelEvent, WireFormat, WsClient};

/// A browser play session: owns the controller and its WebSocket.
///
/// The page drives it from `requestAnimationFrame`, passing the frame
/// timestamp to [`frame`](Self::frame).
#[wasm_bindgen]
pub struct WebSession {
    controller: SyncController<BrowserHooks>,
    ws: WsClient,
}

#[wasm_bindgen]
impl WebSession {
    /// Build a session from an optional TOML config string.
    #[wasm_bindgen(constructor)]
    pub fn new(config_toml: Option<String>) -> Result<WebSession, JsValue> {
        let config = match config_toml.as_deref() {
            Some(text) => ClientConfig::from_toml_str(text).map_err(to_js)?,
            None => ClientConfig::default(),
        };
        let controller = SyncController::new(config, BrowserHooks).map_err(to_js)?;
        Ok(Self {
            controller,
            ws: WsClient::new(WireFormat::Json),
        })
    }

    /// Start joining `game_id` as `player_name`.
    pub fn join(&mut self, game_id: &str, player_name: &str, now_ms: f64) -> Result<(), JsValue> {
        let now = to_duration(now_ms);
        self.controller
            .connect(game_id, player_name, now)
            .map_err(to_js)?;
        self.flush(now);
        Ok(())
    }

    /// Handle a click on the board element. Returns a JSON description of
    /// what happened to it.
    pub fn click(&mut self, element_id: &str, client_x: f64, client_y: f64, now_ms: f64) -> String {
        let attempt = match element_viewport(element_id) {
            Some(viewport) => self.click_in(client_x, client_y, &viewport),
            None => self.controller.throw_at(DVec2::new(client_x, client_y)),
        };
        self.flush(to_duration(now_ms));
        attempt_json(attempt).to_string()
    }

    /// Handle a click given the board's rendered rectangle.
    #[allow(clippy::too_many_arguments)]
    pub fn click_rect(
        &mut self,
        client_x: f64,
        client_y: f64,
        left: f64,
        top: f64,
        width: f64,
        height: f64,
        now_ms: f64,
    ) -> String {
        let viewport = Viewport {
            left,
            top,
            width,
            height,
        };
        let attempt = self.click_in(client_x, client_y, &viewport);
        self.flush(to_duration(now_ms));
        attempt_json(attempt).to_string()
    }

    /// Pump channel events and timers. Call once per animation frame.
    pub fn frame(&mut self, now_ms: f64) {
        let now = to_duration(now_ms);
        for event in self.ws.drain_events() {
            match event {
                ChannelEvent::Open => self.controller.on_channel_open(now),
                ChannelEvent::Closed => self.controller.on_channel_closed(now),
                ChannelEvent::Message(msg) => self.controller.on_message(msg, now),
            }
        }
        self.controller.poll_timers(now);
        self.flush(now);
    }

    /// Current view as JSON, for pages that pull instead of subscribing.
    pub fn view_json(&self) -> String {
        serde_json::to_string(&self.controller.view()).unwrap_or_default()
    }

    pub fn is_input_accepted(&self) -> bool {
        self.controller.is_input_accepted()
    }
}

impl WebSession {
    fn click_in(&mut self, client_x: f64, client_y: f64, viewport: &Viewport) -> ThrowAttempt {
        self.controller
            .throw_at_viewport(DVec2::new(client_x, client_y), viewport)
    }

    fn flush(&mut self, now: Duration) {
        // Connecting can fail synchronously, which feeds back more intents.
        loop {
            let intents = self.controller.drain_outbound();
            if intents.is_empty() {
                break;
            }
            for intent in intents {
                match intent {
                    Intent::Connect => {
                        let url = self.controller.config().server_url.clone();
                        if let Err(e) = self.ws.connect(&url) {
                            crate::diag::console_warn!("Connect to {url} failed: {e}");
                            self.controller.on_channel_closed(now);
                        }
                    },
                    Intent::Send(msg) => {
                        if let Err(e) = self.ws.send(&msg) {
                            crate::diag::console_warn!("Send failed: {e}");
                        }
                    },
                }
            }
        }
    }
}

fn to_duration(now_ms: f64) -> Duration {
    if now_ms.is_finite() && now_ms > 0.0 {
        Duration::from_secs_f64(now_ms / 1000.0)
    } else {
        Duration::ZERO
    }
}

fn to_js(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn attempt_json(attempt: ThrowAttempt) -> serde_json::Value {
    match attempt {
        ThrowAttempt::Sent(hit) => serde_json::json!({
            "kind": "sent",
            "score": hit.score(),
            "multiplier": hit.multiplier().factor(),
            "label": hit.to_string(),
        }),
        ThrowAttempt::Miss => serde_json::json!({ "kind": "miss" }),
        ThrowAttempt::Rejected(reason) => serde_json::json!({
            "kind": "rejected",
            "reason": format!("{reason:?}"),
        }),
    }
}
