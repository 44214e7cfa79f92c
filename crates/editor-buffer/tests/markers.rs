use std::collections::HashSet;

use editor_buffer::{Document, FoldLevel, MarkerHandle};

fn doc_with_lines(lines: usize) -> Document {
    let mut doc = Document::default();
    let text = "x\n".repeat(lines - 1);
    doc.insert_str(0, &text).unwrap();
    assert_eq!(doc.lines_total(), lines);
    doc
}

#[test]
fn test_handles_are_never_reused() {
    let mut doc = doc_with_lines(4);
    let mut seen: HashSet<MarkerHandle> = HashSet::new();
    for round in 0..5 {
        for line in 0..4 {
            let handle = doc.add_mark(line, (round + line) as u32 % 32).unwrap();
            assert!(seen.insert(handle), "handle {handle:?} returned twice");
        }
        doc.delete_all_marks(None);
    }
}

#[test]
fn test_deleted_handle_is_not_found() {
    let mut doc = doc_with_lines(3);
    let handle = doc.add_mark(1, 2).unwrap();
    assert_eq!(doc.line_from_handle(handle), Some(1));
    assert!(doc.delete_mark_from_handle(handle));
    assert_eq!(doc.line_from_handle(handle), None);
    assert!(!doc.delete_mark_from_handle(handle));
}

#[test]
fn test_clearing_document_never_revives_handles() {
    let mut doc = doc_with_lines(5);
    let handles: Vec<_> = (0..5).map(|line| doc.add_mark(line, 1).unwrap()).collect();

    doc.delete_chars(0, doc.length()).unwrap();
    doc.insert_str(0, &"y\n".repeat(4)).unwrap();
    for handle in &handles {
        assert_eq!(doc.line_from_handle(*handle), None);
    }

    let fresh = doc.add_mark(2, 1).unwrap();
    assert!(!handles.contains(&fresh));
    assert_eq!(doc.marker_next(0, 1 << 1), Some(2));
}

#[test]
fn test_markers_merge_when_lines_join() {
    let mut doc = doc_with_lines(3);
    let first = doc.add_mark(0, 1).unwrap();
    let second = doc.add_mark(1, 3).unwrap();
    // Join line 0 and line 1.
    doc.delete_chars(1, 1).unwrap();
    assert_eq!(doc.mark_value(0), (1 << 1) | (1 << 3));
    assert_eq!(doc.line_from_handle(first), Some(0));
    assert_eq!(doc.line_from_handle(second), Some(0));

    assert!(doc.delete_mark(0, 3));
    assert_eq!(doc.mark_value(0), 1 << 1);
    assert_eq!(doc.number_from_line(0, 0), Some(1));
    assert_eq!(doc.handle_from_line(0, 0), Some(first));
}

#[test]
fn test_mark_set_and_queries() {
    let mut doc = doc_with_lines(6);
    doc.add_mark_set(4, 0b1010);
    assert_eq!(doc.mark_value(4), 0b1010);
    assert_eq!(doc.marker_next(0, 0b0010), Some(4));
    assert_eq!(doc.marker_next(5, 0b0010), None);
    assert_eq!(doc.add_mark(1, 32), None);

    doc.delete_all_marks(Some(1));
    assert_eq!(doc.mark_value(4), 0b1000);
}

#[test]
fn test_fold_headers_survive_line_removal() {
    let mut doc = doc_with_lines(5);
    let header = FoldLevel::BASE.with_header(true);
    assert_eq!(doc.set_level(2, header), Some(FoldLevel::BASE));
    assert_eq!(doc.set_level(9, header), None);

    // Remove line 2 by joining it onto line 1: the header flag moves up.
    doc.delete_chars(doc.line_end(1), 1).unwrap();
    assert!(doc.get_level(1).is_header());

    doc.clear_levels();
    assert_eq!(doc.get_level(1), FoldLevel::BASE);
}
