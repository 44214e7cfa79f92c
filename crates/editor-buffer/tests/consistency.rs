//! Randomized consistency tests
//!
//! Random insert/delete/undo/redo sequences are applied to a [`Document`] and to a
//! [`Rope`] reference. After every operation the text and every line start must agree.

use editor_buffer::{Document, DocumentConfig, LineEndTypes};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use ropey::Rope;

const ASCII_PIECES: &[&str] = &["a", "b", "\n", "\r", "\r\n", "xy\nz"];
const UNICODE_PIECES: &[&str] = &["a", "\n", "\r", "\u{2028}", "\u{2029}", "\u{85}", "é"];

fn assert_same_lines(doc: &mut Document, reference: &Rope) {
    assert_eq!(doc.buffer_pointer(), reference.to_string().as_bytes());
    assert_eq!(doc.lines_total(), reference.len_lines());
    for line in 0..reference.len_lines() {
        assert_eq!(doc.line_start(line), reference.line_to_byte(line), "line {line}");
    }
    for position in 0..doc.length() {
        let line = doc.line_from_position(position);
        assert!(doc.line_start(line) <= position);
        assert!(position < doc.line_start(line + 1));
    }
    doc.check();
}

/// Insert or delete at random character boundaries, mirroring every edit in `reference`.
fn random_edit(rng: &mut StdRng, doc: &mut Document, reference: &mut Rope, pieces: &[&str]) {
    let chars = reference.len_chars();
    if chars == 0 || rng.gen_bool(0.6) {
        let at = rng.gen_range(0..=chars);
        let piece = pieces.choose(rng).copied().unwrap_or("a");
        doc.insert_str(reference.char_to_byte(at), piece).unwrap();
        reference.insert(at, piece);
    } else {
        let start = rng.gen_range(0..chars);
        let end = rng.gen_range(start + 1..=chars.min(start + 4));
        let byte_start = reference.char_to_byte(start);
        let byte_len = reference.char_to_byte(end) - byte_start;
        doc.delete_chars(byte_start, byte_len).unwrap();
        reference.remove(start..end);
    }
}

fn run(seed: u64, types: LineEndTypes, pieces: &[&str], operations: usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut doc = Document::new(DocumentConfig::default().with_line_end_types(types));
    let mut reference = Rope::new();
    for _ in 0..operations {
        random_edit(&mut rng, &mut doc, &mut reference, pieces);
        assert_same_lines(&mut doc, &reference);
    }
}

#[test]
fn test_random_edits_match_reference_lines() {
    for seed in 0..8 {
        run(seed, LineEndTypes::Default, ASCII_PIECES, 300);
    }
}

#[test]
fn test_random_edits_match_reference_lines_unicode() {
    for seed in 100..108 {
        run(seed, LineEndTypes::Unicode, UNICODE_PIECES, 300);
    }
}

#[test]
fn test_undo_all_then_redo_all_restores_every_state() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut doc = Document::default();
    let mut reference = Rope::new();
    let mut snapshots = vec![String::new()];
    for _ in 0..200 {
        random_edit(&mut rng, &mut doc, &mut reference, ASCII_PIECES);
        snapshots.push(reference.to_string());
    }

    let mut undone = Vec::new();
    while doc.can_undo() {
        doc.undo();
        let text = String::from_utf8(doc.buffer_pointer().to_vec()).unwrap();
        assert!(snapshots.contains(&text));
        assert_same_lines(&mut doc, &Rope::from_str(&text));
        undone.push(text);
    }
    assert_eq!(doc.length(), 0);

    undone.pop();
    undone.reverse();
    undone.push(reference.to_string());
    for expected in undone {
        doc.redo();
        assert_same_lines(&mut doc, &Rope::from_str(&expected));
    }
    assert!(!doc.can_redo());
}

#[test]
fn test_random_store_and_contraction_line_counts_stay_in_step() {
    use std::cell::RefCell;
    use std::rc::Rc;

    use editor_buffer::{Contraction, ContractionState};

    let display: Rc<RefCell<dyn Contraction>> = Rc::new(RefCell::new(ContractionState::new()));
    let mut rng = StdRng::seed_from_u64(42);
    let mut doc = Document::default();
    let mut reference = Rope::new();
    doc.attach_contraction(&display);

    for i in 0..300 {
        random_edit(&mut rng, &mut doc, &mut reference, ASCII_PIECES);
        if i % 10 == 0 {
            let lines = doc.lines_total();
            let start = rng.gen_range(0..lines);
            let end = rng.gen_range(start..=lines);
            display
                .borrow_mut()
                .set_visible(start, end, rng.gen_bool(0.5));
        }
        if i % 37 == 0 {
            doc.undo();
            reference = Rope::from_str(&String::from_utf8_lossy(doc.buffer_pointer()));
        }
        assert_eq!(display.borrow().lines_in_doc(), doc.lines_total());
        assert!(display.borrow().get_visible(0));
        doc.check();
    }

    let display = display.borrow();
    for line in (0..display.lines_in_doc()).filter(|&line| display.get_visible(line)) {
        assert_eq!(display.doc_from_display(display.display_from_doc(line)), line);
    }
}
