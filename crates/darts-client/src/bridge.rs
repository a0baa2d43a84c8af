use darts_core::board::Viewport;
use darts_core::game_state::ThrowRecord;
use darts_core::notify::Notice;
use darts_core::player::PlayerId;

use crate::controller::UiHooks;
use crate::view::GameView;

#[cfg(target_family = "wasm")]
use wasm_bindgen::JsCast;

/// Page functions the bridge calls, looked up on `window` by name.
pub const UPDATE_FN: &str = "_dartsUpdate";
pub const NOTIFY_FN: &str = "_dartsNotify";
pub const THROW_FN: &str = "_dartsThrow";
pub const GAME_OVER_FN: &str = "_dartsGameOver";
pub const DISCONNECT_FN: &str = "_dartsDisconnect";
pub const RECONNECT_FN: &str = "_dartsReconnect";
pub const HIDE_JOIN_FN: &str = "_dartsHideJoin";

/// [`UiHooks`] that forward to JavaScript functions on the page.
///
/// Missing page functions are skipped silently, so a page only defines the
/// callbacks it renders.
#[derive(Debug, Default)]
pub struct BrowserHooks;

impl UiHooks for BrowserHooks {
    fn state_changed(&mut self, view: &GameView) {
        push_json(UPDATE_FN, view);
    }

    fn notify(&mut self, notice: &Notice) {
        push_json(NOTIFY_FN, notice);
    }

    fn connection_changed(&mut self, connected: bool) {
        if connected {
            call_window_fn(RECONNECT_FN, None);
        } else {
            call_window_fn(DISCONNECT_FN, None);
        }
    }

    fn throw_landed(&mut self, record: &ThrowRecord, announcement: &str) {
        push_json(THROW_FN, &throw_payload(record, announcement));
    }

    fn game_over(&mut self, winner: Option<&PlayerId>, text: Option<&str>) {
        push_json(GAME_OVER_FN, &game_over_payload(winner, text));
    }

    fn dismiss_join_prompt(&mut self) {
        call_window_fn(HIDE_JOIN_FN, None);
    }
}

pub fn throw_payload(record: &ThrowRecord, announcement: &str) -> serde_json::Value {
    serde_json::json!({
        "throw": record,
        "announcement": announcement,
        "bust": record.bust,
        "winner": record.is_winner(),
    })
}

pub fn game_over_payload(winner: Option<&PlayerId>, text: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "winner": winner,
        "text": text,
    })
}

fn push_json<T: serde::Serialize>(name: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(json_str) => call_window_fn(name, Some(&json_str)),
        Err(e) => crate::diag::console_warn!("Failed to serialize {name}: {e}"),
    }
}

/// Call a global JS function by name, with an optional JSON argument.
#[cfg(target_family = "wasm")]
fn call_window_fn(name: &str, json_arg: Option<&str>) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let Ok(val) = js_sys::Reflect::get(&window, &wasm_bindgen::JsValue::from_str(name)) else {
        return;
    };
    if !val.is_function() {
        return;
    }
    let func: js_sys::Function = val.unchecked_into();
    let result = if let Some(json_str) = json_arg {
        match js_sys::JSON::parse(json_str) {
            Ok(parsed) => func.call1(&wasm_bindgen::JsValue::NULL, &parsed),
            Err(e) => {
                crate::diag::console_warn!("JSON parse failed for {name}: {e:?}");
                return;
            },
        }
    } else {
        func.call0(&wasm_bindgen::JsValue::NULL)
    };
    if let Err(e) = result {
        crate::diag::console_warn!("JS bridge {name} failed: {e:?}");
    }
}

#[cfg(not(target_family = "wasm"))]
fn call_window_fn(_name: &str, _json_arg: Option<&str>) {}

/// The rendered rectangle of the board element, for mapping clicks.
#[cfg(target_family = "wasm")]
pub fn element_viewport(element_id: &str) -> Option<Viewport> {
    let element = web_sys::window()?.document()?.get_element_by_id(element_id)?;
    let rect = element.get_bounding_client_rect();
    Some(Viewport {
        left: rect.left(),
        top: rect.top(),
        width: rect.width(),
        height: rect.height(),
    })
}

#[cfg(not(target_family = "wasm"))]
pub fn element_viewport(_element_id: &str) -> Option<Viewport> {
    None
}
