//! vterm-core: Core terminal emulation library
//!
//! This crate provides the building blocks of a virtual terminal:
//! - Color and cell attribute types
//! - Screen buffer management (grid, scrollback, markers)
//! - ANSI/VT escape sequence parsing and dispatch
//! - Selection, search and input encoding
//!
//! [`Terminal`] is the host-facing entry point: feed it application
//! output, drain the [`Event`]s it produces, and read the screen state
//! for rendering.

pub mod buffer;
pub mod cell;
pub mod charset;
pub mod color;
pub mod event;
mod handler;
pub mod input;
pub mod parser;
pub mod screen;
pub mod selection;
pub mod term;
pub mod width;

pub use buffer::{CircularBuffer, Marker, Row};
pub use cell::{Attr, AttrFlags, Cell, DEFAULT_COLOR};
pub use charset::Charset;
pub use color::{ColorPalette, PaletteMatcher, Rgb};
pub use event::{ClipboardOperation, ClipboardSelection, Event, EventSink, FlowControl};
pub use input::{Key, Modifiers, MouseButton, MouseEventKind};
pub use parser::{Parser, Perform};
pub use screen::{
    ClearLineMode, ClearMode, Cursor, CursorStyle, Modes, MouseMode, Screen, ScreenConfig,
    SearchError, SearchResult,
};
pub use selection::{Position, Selection, SelectionMode};
pub use term::{TermOptions, Terminal};
