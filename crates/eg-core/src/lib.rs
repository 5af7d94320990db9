//! Expression G Core Library
//!
//! This crate provides the in-page match-and-highlight engine for the
//! Expression G regex page search extension. It performs no I/O and has no
//! knowledge of browser tabs or messaging; the `eg-sync` crate layers the
//! cross-context protocol on top of it.
//!
//! # Architecture
//!
//! The engine is written against the [`PageTree`] trait rather than a concrete
//! DOM. The in-memory [`Document`] implements it for tests and offline tools,
//! and the wasm bindings implement it over the live browser DOM.
//!
//! # Modules
//!
//! - `pattern`: compiles raw user input into a case-insensitive multiline regex
//! - `tree`: the `PageTree` trait and the marker DOM contract
//! - `dom`: arena-backed in-memory document
//! - `markup`: forgiving markup parser and serializer for `Document`
//! - `highlight`: search, clear and focus navigation over a `PageTree`
//! - `session`: per-tab search session records

pub mod dom;
pub mod highlight;
pub mod markup;
pub mod pattern;
pub mod session;
pub mod tree;

// Re-export commonly used types
pub use dom::{Document, NodeId};
pub use highlight::HighlightEngine;
pub use pattern::{compile, Pattern, PatternError};
pub use session::{SearchSession, SessionPatch, TabId, WorkingSession};
pub use tree::{Fragment, MarkerStyle, PageTree};
