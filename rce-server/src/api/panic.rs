//! Panic boundary
//!
//! The panic hook captures a backtrace on the panicking thread; the
//! catch-panic layer runs on that same thread right after unwinding and
//! turns the panic into the same 500 body as any other fatal error.

use axum::response::{IntoResponse, Response};
use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;

use crate::api::error::ApiError;

thread_local! {
    static LAST_BACKTRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Installs a hook that keeps the backtrace of the latest panic per thread
pub fn install_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let backtrace = Backtrace::force_capture().to_string();
        LAST_BACKTRACE.with(|slot| *slot.borrow_mut() = Some(backtrace));
        previous(info);
    }));
}

/// Response for a handler that panicked
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    let backtrace = LAST_BACKTRACE
        .with(|slot| slot.borrow_mut().take())
        .unwrap_or_default();

    ApiError::Fatal {
        message: format!("handler panicked: {}", message),
        detail: backtrace,
    }
    .into_response()
}
