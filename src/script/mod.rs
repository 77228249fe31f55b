//! Dialogue script model and parser.
//!
//! A script is plain UTF-8 text split into turns by `[Speaker]` markers at
//! the start of a line:
//!
//! ```text
//! [Aria]
//! Did you hear that?
//! [Roger]
//! Hear what? It's
//! perfectly quiet.
//! ```
//!
//! # Example
//!
//! ```rust
//! use narrate::script::parse;
//!
//! let segments = parse("[A]\nhi\n[B]\nbye");
//! assert_eq!(segments.len(), 2);
//! assert_eq!(segments[1].speaker, "B");
//! assert_eq!(segments[1].text, "bye");
//! ```

mod parser;

use std::fmt;

pub use parser::{parse, parse_report};

/// One (speaker, utterance) turn from the script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSegment {
    /// Speaker label, trimmed.
    pub speaker: String,
    /// Utterance text, trimmed. May be empty.
    pub text: String,
    /// 1-based line of the opening marker
    pub line: usize,
}

impl ScriptSegment {
    pub fn new(speaker: impl Into<String>, text: impl Into<String>, line: usize) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
            line,
        }
    }
}

/// Why a piece of input ended up in no segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Text before the first marker.
    Preamble,
    /// A line opened with `[` but never closed it.
    UnterminatedMarker,
    /// A `[]` marker with no label.
    EmptyLabel,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preamble => write!(f, "text before the first [Speaker] marker"),
            Self::UnterminatedMarker => write!(f, "marker is missing its closing ']'"),
            Self::EmptyLabel => write!(f, "marker has an empty speaker label"),
        }
    }
}

/// Input text the grammar excluded from every segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedText {
    /// 1-based line where the dropped run starts
    pub line: usize,
    /// The dropped text, trimmed.
    pub text: String,
    pub reason: DropReason,
}

/// Segments plus everything the scanner had to discard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    pub segments: Vec<ScriptSegment>,
    pub dropped: Vec<DroppedText>,
}

impl ParseReport {
    /// `true` when no input text was lost.
    #[must_use]
    pub fn is_lossless(&self) -> bool {
        self.dropped.is_empty()
    }
}
