//! Decisions the host's cursor hooks make while the overlay is interactive.
//!
//! Installing the hooks is the embedder's job. The hooks forward to the real
//! system calls through the closures they pass in, and ask the gate what to do.

use std::sync::Arc;

use crate::engine::EngineState;

/// Display counter reported to the host when it asked to hide the cursor
/// but the overlay kept it visible
pub const HIDDEN_CURSOR_COUNT: i32 = -1;

#[derive(Clone)]
pub struct CursorGate {
    engine: Arc<EngineState>,
}

impl CursorGate {
    pub fn new(engine: Arc<EngineState>) -> Self {
        Self { engine }
    }

    /// Whether the overlay currently owns the cursor
    pub fn is_interactive(&self) -> bool {
        self.engine.is_interactive()
    }

    /// Cursor visibility request from the host.
    ///
    /// While interactive the cursor is forced visible and hide requests see
    /// [`HIDDEN_CURSOR_COUNT`], so the host believes it succeeded.
    pub fn show_cursor(&self, show: bool, forward: impl FnOnce(bool) -> i32) -> i32 {
        if !self.is_interactive() {
            return forward(show);
        }
        let count = forward(true);
        if show {
            count
        } else {
            HIDDEN_CURSOR_COUNT
        }
    }

    /// Cursor warp request from the host; swallowed while interactive
    pub fn set_cursor_pos(&self, x: i32, y: i32, forward: impl FnOnce(i32, i32) -> bool) -> bool {
        if self.is_interactive() {
            return true;
        }
        forward(x, y)
    }
}
