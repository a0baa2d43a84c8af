/// Console logging that reaches the browser in WASM and compiles away in
/// native and test builds. Use as `crate::diag::console_warn!("msg: {e}")`.

#[cfg(target_family = "wasm")]
macro_rules! console_warn {
    ($($arg:tt)*) => {
        web_sys::console::warn_1(&format!($($arg)*).into())
    };
}

#[cfg(not(target_family = "wasm"))]
macro_rules! console_warn {
    ($($arg:tt)*) => {
        if false { let _ = format_args!($($arg)*); }
    };
}

pub(crate) use console_warn;
