use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[cfg(target_family = "wasm")]
use wasm_bindgen::prelude::*;

use darts_core::net::messages::{ClientMessage, ServerMessage};
use darts_core::net::protocol::{
    ProtocolError, decode_server_json, decode_server_message, encode_client_json,
    encode_client_message,
};

/// Which frame kind outbound messages are written as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WireFormat {
    /// Type byte + MessagePack.
    Binary,
    /// `{"event": ..., "data": ...}` text.
    #[default]
    Json,
}

/// A raw WebSocket frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Binary(Vec<u8>),
    Text(String),
}

pub fn encode_frame(msg: &ClientMessage, format: WireFormat) -> Result<Frame, ProtocolError> {
    match format {
        WireFormat::Binary => encode_client_message(msg).map(Frame::Binary),
        WireFormat::Json => encode_client_json(msg).map(Frame::Text),
    }
}

/// Decode an inbound frame of either kind.
pub fn decode_frame(frame: &Frame) -> Result<ServerMessage, ProtocolError> {
    match frame {
        Frame::Binary(data) => decode_server_message(data),
        Frame::Text(text) => decode_server_json(text),
    }
}

/// What happened on the channel since the last drain.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Open,
    Closed,
    Message(ServerMessage),
}

#[derive(Debug)]
pub enum ChannelError {
    NotConnected,
    Encode(ProtocolError),
    Socket(String),
}

impl std::fmt::Display for ChannelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::Encode(e) => write!(f, "encode failed: {e}"),
            Self::Socket(e) => write!(f, "socket error: {e}"),
        }
    }
}

impl std::error::Error for ChannelError {}

impl From<ProtocolError> for ChannelError {
    fn from(e: ProtocolError) -> Self {
        Self::Encode(e)
    }
}

/// Buffer for events received from the WebSocket.
#[derive(Default)]
struct EventBuffer {
    events: Vec<ChannelEvent>,
}

/// WebSocket client.
/// Uses Rc<RefCell> because WASM is single-threaded.
pub struct WsClient {
    #[cfg(target_family = "wasm")]
    ws: Option<web_sys::WebSocket>,
    format: WireFormat,
    buffer: Rc<RefCell<EventBuffer>>,
    connected: Rc<Cell<bool>>,
    /// Bumped on every connect so callbacks of a replaced socket are ignored.
    generation: Rc<Cell<u32>>,
}

impl Default for WsClient {
    fn default() -> Self {
        Self::new(WireFormat::default())
    }
}

impl WsClient {
    pub fn new(format: WireFormat) -> Self {
        Self {
            #[cfg(target_family = "wasm")]
            ws: None,
            format,
            buffer: Rc::new(RefCell::new(EventBuffer::default())),
            connected: Rc::new(Cell::new(false)),
            generation: Rc::new(Cell::new(0)),
        }
    }

    fn push_event(buffer: &RefCell<EventBuffer>, event: ChannelEvent) {
        buffer.borrow_mut().events.push(event);
    }

    fn push_frame(buffer: &RefCell<EventBuffer>, frame: &Frame) {
        match decode_frame(frame) {
            Ok(msg) => Self::push_event(buffer, ChannelEvent::Message(msg)),
            Err(e) => {
                crate::diag::console_warn!("Dropping undecodable frame: {e}");
                tracing::warn!(error = %e, "Dropping undecodable frame");
            },
        }
    }

    /// Connect to the server WebSocket, replacing any previous socket.
    #[cfg(target_family = "wasm")]
    pub fn connect(&mut self, url: &str) -> Result<(), ChannelError> {
        self.close();
        let generation = self.generation.get().wrapping_add(1);
        self.generation.set(generation);

        let ws = web_sys::WebSocket::new(url)
            .map_err(|e| ChannelError::Socket(format!("WebSocket error: {e:?}")))?;
        ws.set_binary_type(web_sys::BinaryType::Arraybuffer);

        let buffer = Rc::clone(&self.buffer);
        let current = Rc::clone(&self.generation);
        let onmessage =
            Closure::<dyn FnMut(web_sys::MessageEvent)>::new(move |evt: web_sys::MessageEvent| {
                if current.get() != generation {
                    return;
                }
                let data = evt.data();
                if let Ok(buf) = data.clone().dyn_into::<js_sys::ArrayBuffer>() {
                    let bytes = js_sys::Uint8Array::new(&buf).to_vec();
                    Self::push_frame(&buffer, &Frame::Binary(bytes));
                } else if let Some(text) = data.as_string() {
                    Self::push_frame(&buffer, &Frame::Text(text));
                }
            });
        ws.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
        onmessage.forget();

        let buffer_open = Rc::clone(&self.buffer);
        let connected = Rc::clone(&self.connected);
        let current = Rc::clone(&self.generation);
        let onopen = Closure::<dyn FnMut()>::new(move || {
            if current.get() != generation {
                return;
            }
            connected.set(true);
            Self::push_event(&buffer_open, ChannelEvent::Open);
        });
        ws.set_onopen(Some(onopen.as_ref().unchecked_ref()));
        onopen.forget();

        let onerror =
            Closure::<dyn FnMut(web_sys::ErrorEvent)>::new(move |_: web_sys::ErrorEvent| {
                // A close event always follows.
                web_sys::console::log_1(&"WebSocket error".into());
            });
        ws.set_onerror(Some(onerror.as_ref().unchecked_ref()));
        onerror.forget();

        let buffer_close = Rc::clone(&self.buffer);
        let connected_close = Rc::clone(&self.connected);
        let current = Rc::clone(&self.generation);
        let onclose =
            Closure::<dyn FnMut(web_sys::CloseEvent)>::new(move |_: web_sys::CloseEvent| {
                if current.get() != generation {
                    return;
                }
                connected_close.set(false);
                Self::push_event(&buffer_close, ChannelEvent::Closed);
            });
        ws.set_onclose(Some(onclose.as_ref().unchecked_ref()));
        onclose.forget();

        self.ws = Some(ws);
        Ok(())
    }

    /// Stub for non-WASM targets: the channel opens immediately.
    #[cfg(not(target_family = "wasm"))]
    pub fn connect(&mut self, _url: &str) -> Result<(), ChannelError> {
        self.generation.set(self.generation.get().wrapping_add(1));
        self.connected.set(true);
        Self::push_event(&self.buffer, ChannelEvent::Open);
        Ok(())
    }

    /// Close the current socket without reporting a `Closed` event.
    pub fn close(&mut self) {
        self.generation.set(self.generation.get().wrapping_add(1));
        self.connected.set(false);
        #[cfg(target_family = "wasm")]
        if let Some(ws) = self.ws.take() {
            let _ = ws.close();
        }
    }

    /// Encode and send a message in the configured wire format.
    pub fn send(&self, msg: &ClientMessage) -> Result<(), ChannelError> {
        let frame = encode_frame(msg, self.format)?;
        self.send_frame(&frame)
    }

    #[cfg(target_family = "wasm")]
    fn send_frame(&self, frame: &Frame) -> Result<(), ChannelError> {
        let Some(ws) = &self.ws else {
            return Err(ChannelError::NotConnected);
        };
        let result = match frame {
            Frame::Binary(data) => ws.send_with_u8_array(data),
            Frame::Text(text) => ws.send_with_str(text),
        };
        result.map_err(|e| ChannelError::Socket(format!("Send error: {e:?}")))
    }

    #[cfg(not(target_family = "wasm"))]
    fn send_frame(&self, _frame: &Frame) -> Result<(), ChannelError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(ChannelError::NotConnected)
        }
    }

    /// Feed a frame as if it had arrived on the socket (native builds only).
    #[cfg(not(target_family = "wasm"))]
    pub fn receive(&self, frame: &Frame) {
        Self::push_frame(&self.buffer, frame);
    }

    /// Drain all buffered events.
    pub fn drain_events(&self) -> Vec<ChannelEvent> {
        std::mem::take(&mut self.buffer.borrow_mut().events)
    }

    /// Check if the WebSocket is connected.
    pub fn is_connected(&self) -> bool {
        self.connected.get()
    }

    pub fn format(&self) -> WireFormat {
        self.format
    }
}
