use std::io::{Cursor, Read};
use std::ops::ControlFlow;

use fanreduce::error::Error;
use fanreduce::segment::{SegmentEnd, collect_lines, for_each_line};

struct Broken;

impl Read for Broken {
    fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
        Err(std::io::Error::other("broken pipe upstream"))
    }
}

#[test]
fn delivers_lines_in_order_without_delimiter() {
    let got = collect_lines(Cursor::new("one\ntwo\n\nthree\n")).unwrap();
    assert_eq!(got, vec!["one", "two", "", "three"]);
}

#[test]
fn carriage_return_is_kept() {
    let got = collect_lines(Cursor::new("dos\r\nline\r\n")).unwrap();
    assert_eq!(got, vec!["dos\r", "line\r"]);
}

#[test]
fn unterminated_tail_is_dropped() {
    let mut seen = Vec::new();
    let end = for_each_line(Cursor::new("a\nb\ntail"), |line| {
        seen.push(line);
        ControlFlow::Continue(())
    });

    assert!(matches!(end, SegmentEnd::EndOfStream { lines: 2 }));
    assert_eq!(seen, vec!["a", "b"]);
}

#[test]
fn empty_stream_ends_cleanly() {
    let end = for_each_line(Cursor::new(""), |_| ControlFlow::Continue(()));
    assert!(matches!(end, SegmentEnd::EndOfStream { lines: 0 }));
}

#[test]
fn callback_can_stop_the_scan() {
    let mut seen = 0;
    let end = for_each_line(Cursor::new("1\n2\n3\n4\n"), |_| {
        seen += 1;
        if seen == 2 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });

    // The second line was refused, so only the first counts.
    assert!(matches!(end, SegmentEnd::Stopped { lines: 1 }));
    assert_eq!(end.lines(), 1);
    assert_eq!(seen, 2);
}

#[test]
fn read_failure_is_reported_not_treated_as_end() {
    let end = for_each_line(std::io::BufReader::new(Broken), |_| ControlFlow::Continue(()));
    match end {
        SegmentEnd::ReadFailure { lines, ref source } => {
            assert_eq!(lines, 0);
            assert_eq!(source.to_string(), "broken pipe upstream");
        }
        ref other => panic!("expected read failure, got {other:?}"),
    }
    assert!(matches!(end.into_result(), Err(Error::ReadFailure { line: 0, .. })));
}

#[test]
fn invalid_utf8_is_a_read_failure() {
    let result = collect_lines(Cursor::new(b"ok\n\xff\xfe\n".to_vec()));
    assert!(matches!(result, Err(Error::ReadFailure { line: 1, .. })));
}
