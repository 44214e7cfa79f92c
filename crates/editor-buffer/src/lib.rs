#![warn(missing_docs)]
//! Editor Buffer - Editable Text Storage for Editor Widgets
//!
//! # Overview
//!
//! `editor-buffer` is the storage layer underneath an interactive text editor. It holds
//! the document bytes and one style byte per text byte, keeps a line index current
//! across arbitrary insertions and deletions, records an undo/redo history, carries
//! per-line data (markers, fold levels, lexer state, margin text, annotations, tab
//! stops) and maps document lines to display rows once lines are hidden or given
//! extra height.
//!
//! Rendering, input handling, lexing and file I/O live above this crate.
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Document (notifications, forwarding)       │  ← Public API
//! ├──────────────────────┬──────────────────────┤
//! │  Cell Buffer         │  Per-Line Stores     │  ← Text + line data
//! │  (text, styles,      │  (markers, levels,   │
//! │   undo history)      │   state, annotations)│
//! ├──────────────────────┴──────────────────────┤
//! │  Partitioning (line starts, display rows)   │  ← Index
//! ├─────────────────────────────────────────────┤
//! │  SplitVector (gap buffer)                   │  ← Storage
//! └─────────────────────────────────────────────┘
//!
//!          Contraction State (display rows) ← line deltas from Document
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use editor_buffer::{Document, DocumentConfig, ModificationFlags};
//!
//! let mut doc = Document::new(DocumentConfig::default());
//! doc.subscribe(|_, m| {
//!     if m.flags.contains(ModificationFlags::INSERT_TEXT) {
//!         println!("inserted {} bytes, {} new lines", m.length, m.lines_added);
//!     }
//! });
//!
//! doc.insert_str(0, "fn main() {\n}\n").unwrap();
//! assert_eq!(doc.lines_total(), 3);
//!
//! assert_eq!(doc.undo(), Some(0));
//! assert_eq!(doc.length(), 0);
//! ```
//!
//! ## Hiding lines
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use editor_buffer::{Contraction, ContractionState, Document};
//!
//! let display: Rc<RefCell<dyn Contraction>> = Rc::new(RefCell::new(ContractionState::new()));
//! let mut doc = Document::default();
//! doc.insert_str(0, "a\nb\nc\nd").unwrap();
//! doc.attach_contraction(&display);
//!
//! display.borrow_mut().set_visible(1, 3, false);
//! assert_eq!(display.borrow().lines_displayed(), 2);
//! assert_eq!(display.borrow().doc_from_display(1), 3);
//! ```
//!
//! # Module Description
//!
//! - [`split_vector`] - Gap buffer used by every growable array
//! - [`partitioning`] - Sorted partition starts with lazy shifting
//! - [`cell_buffer`] - Text, styles, line starts and undo history
//! - [`undo`] - Action log with coalescing, save point and tentative runs
//! - [`per_line`] - Per-line stores: fold levels, lexer state, tab stops
//! - [`markers`] - Line markers and their handles
//! - [`annotation`] - Margin text and annotations
//! - [`contraction`] - Document line to display row mapping
//! - [`content`] - Pluggable storage providers
//! - [`document`] - The document facade
//!
//! # Positions
//!
//! Every position is a byte offset. Line terminators are LF, CR and CRLF, plus U+2028,
//! U+2029 and NEL with [`LineEndTypes::Unicode`].

pub mod annotation;
pub mod cell_buffer;
pub mod config;
pub mod content;
pub mod contraction;
pub mod document;
pub mod error;
pub mod line_end;
pub mod markers;
pub mod modification;
pub mod partitioning;
pub mod per_line;
pub mod split_vector;
pub mod undo;

pub use annotation::{Annotation, AnnotationStore, AnnotationStyles, LineAnnotation};
pub use cell_buffer::{CellBuffer, EditOutcome, TextBuffer};
pub use config::DocumentConfig;
pub use content::{ContentProvider, StdContent};
pub use contraction::{Contraction, ContractionState};
pub use document::Document;
pub use error::BufferError;
pub use line_end::{LineEnd, LineEndTypes};
pub use markers::{LineMarkers, MARKER_MAX, MarkerHandle, MarkerHandleSet, MarkerStore};
pub use modification::{DocModification, ModificationCallback, ModificationFlags};
pub use partitioning::Partitioning;
pub use per_line::{
    FoldLevel, LevelStore, LineLevels, LineState, LineTabstops, LineVec, PerLine, StateStore,
    TabstopStore,
};
pub use split_vector::SplitVector;
pub use undo::{Action, ActionKind, UndoHistory};
