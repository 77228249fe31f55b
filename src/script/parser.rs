//! Line scanner for `[Speaker]`-annotated scripts.
//!
//! Markers are only recognised at column 0 (the very first marker may be
//! preceded by whitespace). A segment's body runs from the end of its marker
//! to the next line starting with `[`, or end of input.

use super::{DropReason, DroppedText, ParseReport, ScriptSegment};

/// Split a script into ordered segments.
///
/// Never fails; input without markers yields an empty vec. Text the grammar
/// cannot attribute is silently discarded, use [`parse_report`] to see it.
#[must_use]
pub fn parse(raw: &str) -> Vec<ScriptSegment> {
    parse_report(raw).segments
}

/// Split a script into segments and report discarded text.
#[must_use]
pub fn parse_report(raw: &str) -> ParseReport {
    // Editors on Windows like to save UTF-8 with a byte-order mark
    let raw = raw.strip_prefix('\u{FEFF}').unwrap_or(raw);

    let mut scanner = Scanner::default();
    for (idx, line) in raw.split_inclusive('\n').enumerate() {
        scanner.feed(idx + 1, line);
    }
    scanner.finish()
}

/// Classification of a single line.
enum Line<'a> {
    /// `[label]` followed by the rest of the line (newline included).
    Marker { label: &'a str, rest: &'a str },
    /// Starts with `[` but is not a usable marker.
    Malformed(DropReason),
    Text,
}

fn classify(line: &str) -> Line<'_> {
    let Some(after) = line.strip_prefix('[') else {
        return Line::Text;
    };

    // The label must close on the same line.
    let head = after.split(['\r', '\n']).next().unwrap_or("");
    match head.find(']') {
        None => Line::Malformed(DropReason::UnterminatedMarker),
        Some(end) => {
            let label = head[..end].trim();
            if label.is_empty() {
                Line::Malformed(DropReason::EmptyLabel)
            } else {
                Line::Marker {
                    label,
                    rest: &after[end + 1..],
                }
            }
        }
    }
}

enum State {
    /// Before any marker.
    Preamble { line: usize, text: String },
    /// Inside a speaker's turn.
    Segment {
        speaker: String,
        line: usize,
        body: String,
    },
    /// After a broken marker, until the next good one.
    Discarding {
        line: usize,
        reason: DropReason,
        text: String,
    },
}

struct Scanner {
    state: State,
    report: ParseReport,
}

impl Default for Scanner {
    fn default() -> Self {
        Self {
            state: State::Preamble {
                line: 1,
                text: String::new(),
            },
            report: ParseReport::default(),
        }
    }
}

impl Scanner {
    fn feed(&mut self, line_no: usize, line: &str) {
        // Only whitespace so far: the first marker may be indented.
        let candidate = match &self.state {
            State::Preamble { text, .. } if text.trim().is_empty() => line.trim_start(),
            _ => line,
        };

        match classify(candidate) {
            Line::Marker { label, rest } => {
                let next = State::Segment {
                    speaker: label.to_string(),
                    line: line_no,
                    body: rest.to_string(),
                };
                self.transition(next);
            }
            Line::Malformed(reason) => {
                let next = State::Discarding {
                    line: line_no,
                    reason,
                    text: line.to_string(),
                };
                self.transition(next);
            }
            Line::Text => match &mut self.state {
                State::Preamble { text, .. } | State::Discarding { text, .. } => {
                    text.push_str(line);
                }
                State::Segment { body, .. } => body.push_str(line),
            },
        }
    }

    /// Close the current state and move to `next`.
    fn transition(&mut self, next: State) {
        let done = std::mem::replace(&mut self.state, next);
        self.emit(done);
    }

    fn emit(&mut self, state: State) {
        match state {
            State::Segment {
                speaker,
                line,
                body,
            } => {
                self.report
                    .segments
                    .push(ScriptSegment::new(speaker, body.trim(), line));
            }
            State::Preamble { line, text } => {
                let text = text.trim();
                if !text.is_empty() {
                    self.report.dropped.push(DroppedText {
                        line,
                        text: text.to_string(),
                        reason: DropReason::Preamble,
                    });
                }
            }
            State::Discarding { line, reason, text } => {
                self.report.dropped.push(DroppedText {
                    line,
                    text: text.trim().to_string(),
                    reason,
                });
            }
        }
    }

    fn finish(mut self) -> ParseReport {
        let last = std::mem::replace(
            &mut self.state,
            State::Preamble {
                line: 0,
                text: String::new(),
            },
        );
        self.emit(last);
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &str) -> Vec<(String, String)> {
        parse(raw)
            .into_iter()
            .map(|s| (s.speaker, s.text))
            .collect()
    }

    fn pair(speaker: &str, text: &str) -> (String, String) {
        (speaker.to_string(), text.to_string())
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(parse("").is_empty());
        assert!(parse_report("").is_lossless());
    }

    #[test]
    fn text_without_markers_yields_nothing() {
        assert!(parse("no markers here").is_empty());
    }

    #[test]
    fn two_speakers() {
        assert_eq!(
            pairs("[A]\nhi\n[B]\nbye"),
            vec![pair("A", "hi"), pair("B", "bye")]
        );
    }

    #[test]
    fn body_spans_multiple_lines() {
        let raw = "[Aria]\nDid you hear that?\nListen.\n\n[Roger]\nHear what?\n";
        assert_eq!(
            pairs(raw),
            vec![
                pair("Aria", "Did you hear that?\nListen."),
                pair("Roger", "Hear what?"),
            ]
        );
    }

    #[test]
    fn label_and_body_are_trimmed() {
        assert_eq!(
            pairs("[  Lily \t]   \n\n   Hello there.   \n\n"),
            vec![pair("Lily", "Hello there.")]
        );
    }

    #[test]
    fn body_may_start_on_marker_line() {
        assert_eq!(pairs("[A] hi there\n[B]bye"), vec![pair("A", "hi there"), pair("B", "bye")]);
    }

    #[test]
    fn whitespace_only_body_is_kept_as_empty() {
        assert_eq!(
            pairs("[A]\n   \n[B]\nx"),
            vec![pair("A", ""), pair("B", "x")]
        );
    }

    #[test]
    fn n_markers_give_n_segments_in_order() {
        let raw: String = (0..25).map(|i| format!("[S{i}]\nline {i}\n")).collect();
        let segments = parse(&raw);
        assert_eq!(segments.len(), 25);
        for (i, seg) in segments.iter().enumerate() {
            assert_eq!(seg.speaker, format!("S{i}"));
            assert_eq!(seg.text, format!("line {i}"));
        }
    }

    #[test]
    fn records_marker_line_numbers() {
        let segments = parse("[A]\none\ntwo\n[B]\nthree");
        assert_eq!(segments[0].line, 1);
        assert_eq!(segments[1].line, 4);
    }

    #[test]
    fn brackets_inside_a_line_do_not_split() {
        assert_eq!(
            pairs("[A]\nShe said [quietly] no. [B] too\n"),
            vec![pair("A", "She said [quietly] no. [B] too")]
        );
    }

    #[test]
    fn indented_marker_mid_script_is_body_text() {
        assert_eq!(
            pairs("[A]\nhi\n  [B]\nbye"),
            vec![pair("A", "hi\n  [B]\nbye")]
        );
    }

    #[test]
    fn first_marker_may_be_indented() {
        assert_eq!(pairs("\n   [A]\nhi"), vec![pair("A", "hi")]);
    }

    #[test]
    fn bom_prefixed_script() {
        let report = parse_report("\u{FEFF}[Aria]\nHello\n[Roger]\nHi");

        assert!(report.is_lossless());
        assert_eq!(report.segments.len(), 2);
        assert_eq!(report.segments[0].speaker, "Aria");
        assert_eq!(report.segments[0].text, "Hello");
        assert_eq!(report.segments[0].line, 1);
        assert_eq!(report.segments[1].speaker, "Roger");
    }

    #[test]
    fn preamble_is_dropped_and_reported() {
        let report = parse_report("Title: Episode 1\n\n[A]\nhi");
        assert_eq!(report.segments.len(), 1);
        assert_eq!(report.dropped.len(), 1);
        assert_eq!(report.dropped[0].reason, DropReason::Preamble);
        assert_eq!(report.dropped[0].text, "Title: Episode 1");
        assert_eq!(report.dropped[0].line, 1);
    }

    #[test]
    fn unterminated_marker_drops_text_until_next_marker() {
        let report = parse_report("[A]\nhi\n[Bob\nlost words\n[C]\nfound");
        assert_eq!(
            report
                .segments
                .iter()
                .map(|s| (s.speaker.as_str(), s.text.as_str()))
                .collect::<Vec<_>>(),
            vec![("A", "hi"), ("C", "found")]
        );
        assert_eq!(report.dropped.len(), 1);
        assert_eq!(report.dropped[0].reason, DropReason::UnterminatedMarker);
        assert_eq!(report.dropped[0].line, 3);
        assert_eq!(report.dropped[0].text, "[Bob\nlost words");
    }

    #[test]
    fn closing_bracket_on_a_later_line_does_not_rescue_marker() {
        let report = parse_report("[Bob\nhello]\n");
        assert!(report.segments.is_empty());
        assert_eq!(report.dropped[0].reason, DropReason::UnterminatedMarker);
    }

    #[test]
    fn empty_label_is_malformed() {
        let report = parse_report("[]\nwho am I\n[ ]\nnobody");
        assert!(report.segments.is_empty());
        assert_eq!(report.dropped.len(), 2);
        assert!(report
            .dropped
            .iter()
            .all(|d| d.reason == DropReason::EmptyLabel));
    }

    #[test]
    fn malformed_marker_ends_previous_segment() {
        let report = parse_report("[A]\nkept\n[oops\ngone");
        assert_eq!(report.segments[0].text, "kept");
        assert!(!report.is_lossless());
    }

    #[test]
    fn crlf_line_endings() {
        assert_eq!(
            pairs("[A]\r\nhi\r\n[B]\r\nbye\r\n"),
            vec![pair("A", "hi"), pair("B", "bye")]
        );
    }

    #[test]
    fn unicode_labels_and_text() {
        assert_eq!(
            pairs("[Zoë]\nCafé ☕\n[李]\n你好"),
            vec![pair("Zoë", "Café ☕"), pair("李", "你好")]
        );
    }

    #[test]
    fn parse_is_deterministic() {
        let raw = "[A]\n1\n[B]\n2\n[A]\n3";
        assert_eq!(parse(raw), parse(raw));
    }
}
