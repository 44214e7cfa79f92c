//! Per-line annotations and end-of-line annotations.
//!
//! An annotation is a block of text displayed under (or after) a line, with either one
//! style for the whole block or a style byte per text byte. Lines without an
//! annotation cost one `None`.

use crate::per_line::{Blank, LineVec, PerLine};

/// Styling of an annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationStyles {
    /// One style for every byte.
    Uniform(u8),
    /// One style byte per text byte.
    PerByte(Vec<u8>),
}

/// Text and styling attached to one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    text: String,
    styles: AnnotationStyles,
}

impl Annotation {
    /// The annotation text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The annotation styling.
    pub fn styles(&self) -> &AnnotationStyles {
        &self.styles
    }

    /// Number of display lines the text occupies.
    pub fn lines(&self) -> usize {
        self.text.bytes().filter(|&b| b == b'\n').count() + 1
    }
}

/// Annotation storage.
pub trait AnnotationStore: PerLine {
    /// Set (or with `None`, remove) the text of `line`. An existing uniform style is kept.
    fn set_text(&mut self, line: usize, text: Option<&str>);
    /// Annotation text of `line`.
    fn text(&self, line: usize) -> Option<&str>;
    /// Give the whole annotation of `line` one style, creating an empty one if needed.
    fn set_style(&mut self, line: usize, style: u8);
    /// Uniform style of `line`; 0 when absent or styled per byte.
    fn style(&self, line: usize) -> u8;
    /// Style each byte of the annotation on `line`. Missing bytes get style 0 and surplus
    /// styles are dropped.
    fn set_styles(&mut self, line: usize, styles: &[u8]);
    /// Per-byte styles of `line`, if it is styled that way.
    fn styles(&self, line: usize) -> Option<&[u8]>;
    /// Returns `true` if `line` is styled per byte.
    fn multiple_styles(&self, line: usize) -> bool;
    /// Length in bytes of the annotation text of `line`.
    fn length(&self, line: usize) -> usize;
    /// Display lines needed by the annotation of `line`; 0 without one.
    fn annotation_lines(&self, line: usize) -> usize;
    /// Remove every annotation.
    fn clear_all(&mut self);
    /// Returns `true` if any line has an annotation.
    fn any_set(&self) -> bool;
}

/// Standard [`AnnotationStore`].
pub type LineAnnotation = LineVec<Option<Box<Annotation>>, Blank>;

impl AnnotationStore for LineAnnotation {
    fn set_text(&mut self, line: usize, text: Option<&str>) {
        let Some(slot) = self.get_mut(line) else {
            return;
        };
        match text {
            Some(text) => {
                let style = slot.as_ref().map_or(0, |a| match a.styles {
                    AnnotationStyles::Uniform(style) => style,
                    AnnotationStyles::PerByte(_) => 0,
                });
                *slot = Some(Box::new(Annotation {
                    text: text.to_owned(),
                    styles: AnnotationStyles::Uniform(style),
                }));
            }
            None => *slot = None,
        }
    }

    fn text(&self, line: usize) -> Option<&str> {
        self.get(line)?.as_deref().map(Annotation::text)
    }

    fn set_style(&mut self, line: usize, style: u8) {
        let Some(slot) = self.get_mut(line) else {
            return;
        };
        let annotation = slot.get_or_insert_with(|| {
            Box::new(Annotation {
                text: String::new(),
                styles: AnnotationStyles::Uniform(style),
            })
        });
        annotation.styles = AnnotationStyles::Uniform(style);
    }

    fn style(&self, line: usize) -> u8 {
        match self.get(line).and_then(Option::as_deref) {
            Some(Annotation {
                styles: AnnotationStyles::Uniform(style),
                ..
            }) => *style,
            _ => 0,
        }
    }

    fn set_styles(&mut self, line: usize, styles: &[u8]) {
        let Some(slot) = self.get_mut(line) else {
            return;
        };
        let annotation = slot.get_or_insert_with(|| {
            Box::new(Annotation {
                text: String::new(),
                styles: AnnotationStyles::PerByte(Vec::new()),
            })
        });
        let mut per_byte: Vec<u8> = styles.iter().copied().take(annotation.text.len()).collect();
        per_byte.resize(annotation.text.len(), 0);
        annotation.styles = AnnotationStyles::PerByte(per_byte);
    }

    fn styles(&self, line: usize) -> Option<&[u8]> {
        match &self.get(line)?.as_deref()?.styles {
            AnnotationStyles::PerByte(styles) => Some(styles.as_slice()),
            AnnotationStyles::Uniform(_) => None,
        }
    }

    fn multiple_styles(&self, line: usize) -> bool {
        self.styles(line).is_some()
    }

    fn length(&self, line: usize) -> usize {
        self.text(line).map_or(0, str::len)
    }

    fn annotation_lines(&self, line: usize) -> usize {
        self.get(line)
            .and_then(Option::as_deref)
            .map_or(0, Annotation::lines)
    }

    fn clear_all(&mut self) {
        self.for_each_mut(|slot| *slot = None);
    }

    fn any_set(&self) -> bool {
        self.iter().any(Option::is_some)
    }
}
