use super::*;

fn source(content: &str) -> SourceFile {
    SourceFile::new(PathBuf::from("test.m"), content.to_string())
}

#[test]
fn test_get_line() {
    let source = source("main\n w 1\r\n q");

    assert_eq!(source.get_line(0), Some("main"));
    assert_eq!(source.get_line(1), Some(" w 1"));
    assert_eq!(source.get_line(2), Some(" q"));
    assert_eq!(source.get_line(3), None);
}

#[test]
fn test_line_offset() {
    let source = source("ab\ncd\nef");
    assert_eq!(source.line_offset(0), Some(0));
    assert_eq!(source.line_offset(1), Some(3));
    assert_eq!(source.line_offset(2), Some(6));
    assert_eq!(source.line_offset(3), None);
}

#[test]
fn test_absolute_range_is_clamped_to_line() {
    let source = source("main\n w 1");
    assert_eq!(source.absolute_range(1, 1..2), (6, 1));
    assert_eq!(source.absolute_range(1, 3..40), (8, 1));
    assert_eq!(source.absolute_range(9, 0..1), (source.content().len(), 0));
}

#[test]
fn test_span_merge() {
    let a = Span::new(Position::new(0, 1), Position::new(0, 3));
    let b = Span::new(Position::new(0, 2), Position::new(1, 0));
    let merged = a.merge(&b);
    assert_eq!(merged.start, Position::new(0, 1));
    assert_eq!(merged.end, Position::new(1, 0));
}
