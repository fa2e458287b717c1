//! Terminal event notifications
//!
//! State changes that a host (renderer, multiplexer, test harness)
//! needs to observe are queued as [`Event`] values and drained after
//! each processing step. Hosts either consume the returned `Vec` or
//! implement [`EventSink`] to receive events directly.

use serde::{Deserialize, Serialize};

/// Which clipboard an OSC 52 operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClipboardSelection {
    /// System clipboard (c)
    Clipboard,
    /// Primary selection (p)
    Primary,
    /// Secondary/select (s)
    Select,
}

/// Clipboard operation requested by the application via OSC 52.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClipboardOperation {
    /// Set clipboard contents (already base64-decoded)
    Set {
        selection: ClipboardSelection,
        data: Vec<u8>,
    },
    /// Query clipboard contents
    Query { selection: ClipboardSelection },
}

/// Flow control requests for the byte producer feeding the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    /// Too many chunks queued; stop reading from the source
    Pause,
    /// Queue drained; resume reading
    Resume,
}

/// Notification emitted by the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Viewport rows `start..=end` changed and need redrawing
    Refresh { start: usize, end: usize },
    /// The viewport scrolled; `ydisp` is the new top row of the display
    Scroll { ydisp: usize },
    /// A line feed was processed
    LineFeed,
    /// The cursor moved
    CursorMove,
    /// BEL received
    Bell,
    /// Window title changed (OSC 0/2)
    TitleChanged(String),
    /// Icon name changed (OSC 0/1)
    IconNameChanged(String),
    /// The screen was resized
    Resize { cols: usize, rows: usize },
    /// Bytes to send back to the application (DSR, DA, DECRQSS replies)
    Send(Vec<u8>),
    /// Clipboard access requested by the application
    Clipboard(ClipboardOperation),
    /// Write queue crossed a flow-control threshold
    FlowControl(FlowControl),
}

/// Receiver for terminal events.
pub trait EventSink {
    fn emit(&mut self, event: Event);
}

impl EventSink for Vec<Event> {
    fn emit(&mut self, event: Event) {
        self.push(event);
    }
}
