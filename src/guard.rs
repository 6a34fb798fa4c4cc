// src/guard.rs
//! Process-level fault reporting.
//!
//! The WhatsApp Web client occasionally raises "Execution context was
//! destroyed" when the page navigates under it. The session survives, so the
//! fault is logged as a warning. Every other panic or gateway fault is logged
//! as an error; nothing is restarted.

use std::any::Any;

/// Substrings of known harmless transport faults.
pub const KNOWN_TRANSPORT_GLITCHES: &[&str] = &["Execution context was destroyed"];

pub fn is_known_transport_glitch(message: &str) -> bool {
    KNOWN_TRANSPORT_GLITCHES
        .iter()
        .any(|needle| message.contains(needle))
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Log a fault coming from `source` at the level its kind deserves.
pub fn report_transport_fault(source: &str, message: &str) {
    if is_known_transport_glitch(message) {
        tracing::warn!(target: "guard", source, fault = message, "suppressed known transport glitch");
    } else {
        tracing::error!(target: "guard", source, fault = message, "transport fault");
    }
}

/// Route panics through `tracing`. Known transport glitches are logged at
/// warn and skip the default hook; everything else also reaches it.
pub fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let message = panic_message(info.payload());
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();

        if is_known_transport_glitch(&message) {
            tracing::warn!(target: "guard", %location, fault = %message, "suppressed known transport glitch");
            return;
        }
        tracing::error!(target: "guard", %location, fault = %message, "panic");
        default_hook(info);
    }));
}
