//! Marker scanning over a growing buffer
//!
//! Delimiters are literal strings. Matching is leftmost-longest and
//! non-overlapping. A position whose remaining text is a strict prefix of
//! some delimiter is *pending*: nothing at or after it is confirmed until
//! more input arrives or the stream is declared finished. The same rule
//! keeps a shorter delimiter from being confirmed while a longer one that
//! shares its prefix could still match.
//!
//! Decisions made before the pending position never change when more text
//! is appended, which is what lets [`IncrementalScanner`] resume where it
//! stopped and still agree with a full [`MarkerScanner::scan`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a delimiter means to the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DelimiterRole {
    /// Narration → payload boundary
    Split,
    /// Outer checkpoint announcement
    Announcement,
    /// Opens an inner completion block
    BlockOpen,
    /// Closes an inner completion block
    BlockClose,
}

impl fmt::Display for DelimiterRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DelimiterRole::Split => "split",
            DelimiterRole::Announcement => "announcement",
            DelimiterRole::BlockOpen => "block-open",
            DelimiterRole::BlockClose => "block-close",
        })
    }
}

/// A literal delimiter token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiter {
    pub role: DelimiterRole,
    pub token: String,
}

impl Delimiter {
    #[must_use]
    pub fn new(role: DelimiterRole, token: impl Into<String>) -> Self {
        Self {
            role,
            token: token.into(),
        }
    }
}

/// A confirmed delimiter occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub role: DelimiterRole,
    /// Byte offset of the first byte of the token
    pub offset: usize,
    /// Token length in bytes
    pub len: usize,
}

impl Occurrence {
    /// Offset one past the token
    #[inline]
    #[must_use]
    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// Result of scanning a text
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanReport {
    /// Confirmed occurrences in offset order
    pub occurrences: Vec<Occurrence>,
    /// Start of the unconfirmed tail, if the tail could still become a delimiter
    pub pending_from: Option<usize>,
}

impl ScanReport {
    /// First confirmed split delimiter
    #[must_use]
    pub fn first_split(&self) -> Option<&Occurrence> {
        self.occurrences
            .iter()
            .find(|o| o.role == DelimiterRole::Split)
    }

    /// Confirmed announcements
    pub fn announcements(&self) -> impl Iterator<Item = &Occurrence> {
        self.occurrences
            .iter()
            .filter(|o| o.role == DelimiterRole::Announcement)
    }

    /// Number of confirmed announcements
    #[must_use]
    pub fn announcement_count(&self) -> usize {
        self.announcements().count()
    }

    /// Length of the prefix that provably holds no unterminated delimiter
    #[must_use]
    pub fn safe_len(&self, text_len: usize) -> usize {
        self.pending_from.unwrap_or(text_len)
    }
}

enum Decision {
    Match(usize),
    Pending,
    Advance,
}

/// Stateless scanner over a fixed delimiter set
#[derive(Debug, Clone)]
pub struct MarkerScanner {
    delimiters: Vec<Delimiter>,
    longest: usize,
}

impl MarkerScanner {
    /// Create scanner; empty tokens are ignored
    #[must_use]
    pub fn new(delimiters: impl IntoIterator<Item = Delimiter>) -> Self {
        let delimiters: Vec<Delimiter> = delimiters
            .into_iter()
            .filter(|d| !d.token.is_empty())
            .collect();
        let longest = delimiters.iter().map(|d| d.token.len()).max().unwrap_or(0);
        Self {
            delimiters,
            longest,
        }
    }

    /// Delimiters recognised by this scanner
    #[inline]
    #[must_use]
    pub fn delimiters(&self) -> &[Delimiter] {
        &self.delimiters
    }

    /// Length of the longest delimiter in bytes
    #[inline]
    #[must_use]
    pub fn longest(&self) -> usize {
        self.longest
    }

    /// Scan the whole text
    ///
    /// With `finished` set no tail is held back: strict prefixes are plain
    /// text and an ambiguous shorter match is confirmed.
    #[must_use]
    pub fn scan(&self, text: &str, finished: bool) -> ScanReport {
        let mut report = ScanReport::default();
        let stop = self.scan_from(text, 0, finished, &mut report.occurrences);
        report.pending_from = (stop < text.len()).then_some(stop);
        report
    }

    /// Length of the longest suffix of `text` that is a strict prefix of a delimiter
    #[must_use]
    pub fn partial_suffix_len(&self, text: &str) -> usize {
        let report = self.scan(text, false);
        report.pending_from.map_or(0, |p| text.len() - p)
    }

    /// Scan from `start`, appending confirmed occurrences; returns the
    /// position scanning stopped at (`text.len()` unless a tail is pending)
    fn scan_from(
        &self,
        text: &str,
        start: usize,
        finished: bool,
        out: &mut Vec<Occurrence>,
    ) -> usize {
        let mut pos = start;
        while pos < text.len() {
            let rest = &text[pos..];
            match self.decide(rest, finished) {
                Decision::Match(idx) => {
                    let delimiter = &self.delimiters[idx];
                    out.push(Occurrence {
                        role: delimiter.role,
                        offset: pos,
                        len: delimiter.token.len(),
                    });
                    pos += delimiter.token.len();
                }
                Decision::Pending => return pos,
                Decision::Advance => {
                    pos += rest.chars().next().map_or(1, char::len_utf8);
                }
            }
        }
        text.len()
    }

    fn decide(&self, rest: &str, finished: bool) -> Decision {
        let best = self
            .delimiters
            .iter()
            .enumerate()
            .filter(|(_, d)| rest.starts_with(d.token.as_str()))
            .max_by_key(|(_, d)| d.token.len())
            .map(|(i, d)| (i, d.token.len()));

        if !finished {
            let floor = best.map_or(0, |(_, len)| len);
            let could_extend = self
                .delimiters
                .iter()
                .any(|d| d.token.len() > rest.len() && d.token.len() > floor && d.token.starts_with(rest));
            if could_extend {
                return Decision::Pending;
            }
        }

        match best {
            Some((idx, _)) => Decision::Match(idx),
            None => Decision::Advance,
        }
    }
}

/// Resumable scan over a text that only grows
#[derive(Debug, Clone)]
pub struct IncrementalScanner {
    scanner: MarkerScanner,
    occurrences: Vec<Occurrence>,
    resume: usize,
    finished: bool,
}

impl IncrementalScanner {
    #[must_use]
    pub fn new(scanner: MarkerScanner) -> Self {
        Self {
            scanner,
            occurrences: Vec::new(),
            resume: 0,
            finished: false,
        }
    }

    /// Scan newly appended text; returns the number of newly confirmed
    /// occurrences
    ///
    /// `text` must extend the text passed on the previous call.
    pub fn advance(&mut self, text: &str) -> usize {
        self.run(text, false)
    }

    /// Final scan with no tail held back
    pub fn finish(&mut self, text: &str) -> usize {
        let added = self.run(text, true);
        self.finished = true;
        added
    }

    fn run(&mut self, text: &str, finished: bool) -> usize {
        if self.finished {
            return 0;
        }
        let before = self.occurrences.len();
        let start = self.resume.min(text.len());
        self.resume = self
            .scanner
            .scan_from(text, start, finished, &mut self.occurrences);
        self.occurrences.len() - before
    }

    /// Everything confirmed so far, in offset order
    #[inline]
    #[must_use]
    pub fn occurrences(&self) -> &[Occurrence] {
        &self.occurrences
    }

    /// Position scanning will resume from; equals the safe length of the text
    #[inline]
    #[must_use]
    pub fn resume_at(&self) -> usize {
        self.resume
    }

    /// Report equivalent to a full scan of the text seen so far
    #[must_use]
    pub fn report(&self, text_len: usize) -> ScanReport {
        ScanReport {
            occurrences: self.occurrences.clone(),
            pending_from: (self.resume < text_len).then_some(self.resume),
        }
    }

    #[inline]
    #[must_use]
    pub fn scanner(&self) -> &MarkerScanner {
        &self.scanner
    }
}
