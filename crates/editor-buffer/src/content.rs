//! Content providers.
//!
//! A [`Document`](crate::Document) does not construct its storage directly; it asks a
//! [`ContentProvider`] for a text buffer and one store of each per-line kind. A host
//! that keeps its text elsewhere (a database, a memory-mapped log, a remote file)
//! implements the provider and returns its own [`TextBuffer`] and stores.
//! [`StdContent`] hands out the in-memory implementations from this crate.

use std::cell::RefCell;
use std::rc::Rc;

use crate::annotation::{AnnotationStore, LineAnnotation};
use crate::cell_buffer::{CellBuffer, TextBuffer};
use crate::config::DocumentConfig;
use crate::contraction::Contraction;
use crate::markers::{LineMarkers, MarkerStore};
use crate::per_line::{
    LevelStore, LineLevels, LineState, LineTabstops, StateStore, TabstopStore,
};

/// Source of a document's storage.
pub trait ContentProvider {
    /// A fresh, empty text buffer. The document applies the rest of `config` itself.
    fn cell_buffer(&self, config: &DocumentConfig) -> Box<dyn TextBuffer>;
    /// A fresh marker store.
    fn line_markers(&self) -> Box<dyn MarkerStore>;
    /// A fresh fold level store.
    fn line_levels(&self) -> Box<dyn LevelStore>;
    /// A fresh line state store.
    fn line_state(&self) -> Box<dyn StateStore>;
    /// A fresh store for margin text.
    fn line_margin(&self) -> Box<dyn AnnotationStore>;
    /// A fresh store for annotations.
    fn line_annotation(&self) -> Box<dyn AnnotationStore>;

    /// A fresh tab stop store.
    fn line_tabstops(&self) -> Box<dyn TabstopStore> {
        Box::new(LineTabstops::new())
    }

    /// Display line mapping owned by the provider, if it manages one.
    ///
    /// The document keeps only a weak reference, so the provider must hold on to it.
    fn contraction_state(&self) -> Option<Rc<RefCell<dyn Contraction>>> {
        None
    }
}

/// The in-memory storage of this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdContent;

impl ContentProvider for StdContent {
    fn cell_buffer(&self, config: &DocumentConfig) -> Box<dyn TextBuffer> {
        Box::new(CellBuffer::with_capacity(config.initial_capacity))
    }

    fn line_markers(&self) -> Box<dyn MarkerStore> {
        Box::new(LineMarkers::new())
    }

    fn line_levels(&self) -> Box<dyn LevelStore> {
        Box::new(LineLevels::new())
    }

    fn line_state(&self) -> Box<dyn StateStore> {
        Box::new(LineState::new())
    }

    fn line_margin(&self) -> Box<dyn AnnotationStore> {
        Box::new(LineAnnotation::new())
    }

    fn line_annotation(&self) -> Box<dyn AnnotationStore> {
        Box::new(LineAnnotation::new())
    }
}
