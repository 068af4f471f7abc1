//! Text-part post-processing.
//!
//! Consumes the HTML parser's normalized output (or a plain-text part):
//! canonicalizes newlines into single spaces while recording their
//! offsets and per-part character statistics, assembles the merged
//! exception list for the tokenizer, and compares parts by a bounded
//! Levenshtein distance over word hashes.

use html::{ExceptionKind, ProcessException};

/// Combined word-count bound for part comparison.
pub const MAX_WORDS: usize = 8192;

/// Character-class statistics accumulated while stripping newlines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextStats {
    pub nlines: usize,
    pub empty_lines: usize,
    pub spaces: usize,
    pub double_spaces: usize,
    pub non_spaces: usize,
    pub ascii_chars: usize,
    pub non_ascii_chars: usize,
    pub capital_letters: usize,
    pub numeric_characters: usize,
}

/// Newline-stripped content plus the offsets where newlines used to be.
#[derive(Clone, Debug, Default)]
pub struct StrippedText {
    pub content: Vec<u8>,
    /// Offsets into `content`, recorded at each canonicalized newline.
    pub newline_offsets: Vec<usize>,
    pub stats: TextStats,
}

/// A fully normalized text part ready for tokenization.
#[derive(Clone, Debug)]
pub struct NormalizedPart {
    pub content: Vec<u8>,
    pub stats: TextStats,
    pub exceptions: Vec<ProcessException>,
}

/// Canonicalize newlines in `input`.
///
/// CR, LF and CRLF all collapse; for HTML parts (and after punctuation in
/// plain parts) a single space replaces the break so words do not fuse.
/// Runs of blank lines emit one space and count as empty lines. The
/// recorded offsets drive the `Newline` exceptions downstream.
pub fn strip_newlines(input: &[u8], html_part: bool) -> StrippedText {
    enum State {
        Normal,
        SeenCr,
        SeenLf,
    }

    let mut out = StrippedText {
        content: Vec::with_capacity(input.len()),
        ..StrippedText::default()
    };
    let pe = input.len();
    let mut p = 0usize;
    let mut c = 0usize;
    let mut last_c = 0u8;
    let mut crlf_added = false;
    let mut state = State::Normal;

    let break_needs_space =
        |last: u8| -> bool { html_part || last.is_ascii_punctuation() };

    while p < pe {
        let byte = input[p];
        if byte == b'\r' {
            match state {
                State::Normal => {
                    state = State::SeenCr;
                    if p > c {
                        last_c = input[p - 1];
                        out.content.extend_from_slice(&input[c..p]);
                    }
                    crlf_added = false;
                    c = p + 1;
                }
                State::SeenCr => {
                    // Blank line made of \r\r.
                    if !crlf_added {
                        out.content.push(b' ');
                        crlf_added = true;
                        out.newline_offsets.push(out.content.len());
                    }
                    out.stats.nlines += 1;
                    out.stats.empty_lines += 1;
                    c = p + 1;
                }
                State::SeenLf => {
                    // Likely \r\n\r...
                    state = State::SeenCr;
                    c = p + 1;
                }
            }
            p += 1;
        } else if byte == b'\n' {
            match state {
                State::Normal => {
                    state = State::SeenLf;
                    if p > c {
                        last_c = input[p - 1];
                        out.content.extend_from_slice(&input[c..p]);
                    }
                    c = p + 1;
                    if break_needs_space(last_c) {
                        out.content.push(b' ');
                        out.newline_offsets.push(out.content.len());
                        crlf_added = true;
                    } else {
                        crlf_added = false;
                    }
                }
                State::SeenCr => {
                    // \r\n pair.
                    if !crlf_added {
                        if break_needs_space(last_c) {
                            out.content.push(b' ');
                            crlf_added = true;
                        }
                        out.newline_offsets.push(out.content.len());
                    }
                    c = p + 1;
                    state = State::SeenLf;
                }
                State::SeenLf => {
                    // Blank line made of \n\n.
                    if !crlf_added {
                        out.content.push(b' ');
                        crlf_added = true;
                        out.newline_offsets.push(out.content.len());
                    }
                    out.stats.nlines += 1;
                    out.stats.empty_lines += 1;
                    c = p + 1;
                }
            }
            p += 1;
        } else {
            match state {
                State::Normal => {
                    if byte == b' ' {
                        out.stats.spaces += 1;
                        if p > 0 && input[p - 1] == b' ' {
                            out.stats.double_spaces += 1;
                        }
                    } else {
                        out.stats.non_spaces += 1;
                        if byte & 0x80 != 0 {
                            out.stats.non_ascii_chars += 1;
                        } else {
                            if byte.is_ascii_uppercase() {
                                out.stats.capital_letters += 1;
                            } else if byte.is_ascii_digit() {
                                out.stats.numeric_characters += 1;
                            }
                            out.stats.ascii_chars += 1;
                        }
                    }
                }
                State::SeenCr | State::SeenLf => {
                    out.stats.nlines += 1;
                    if !crlf_added {
                        out.newline_offsets.push(out.content.len());
                    }
                    // Skip the indentation of the new line.
                    if byte == b' ' {
                        if !crlf_added {
                            out.content.push(b' ');
                        }
                        while p < pe && input[p] == b' ' {
                            p += 1;
                            c += 1;
                            out.stats.spaces += 1;
                        }
                        if p < pe && (input[p] == b'\r' || input[p] == b'\n') {
                            out.stats.empty_lines += 1;
                        }
                    }
                    state = State::Normal;
                }
            }
            p += 1;
        }
    }

    // Leftover run; its characters were already counted above.
    if p > c {
        match state {
            State::Normal => {
                out.content.extend_from_slice(&input[c..pe]);
            }
            State::SeenCr | State::SeenLf => {
                if !crlf_added {
                    out.content.push(b' ');
                    out.newline_offsets.push(out.content.len());
                }
                out.stats.nlines += 1;
            }
        }
    }

    out
}

/// Strip newlines and build the part's newline exceptions.
pub fn normalize_text_part(input: &[u8], html_part: bool) -> NormalizedPart {
    let stripped = strip_newlines(input, html_part);
    let exceptions = newline_exceptions(&stripped);
    log::debug!(
        target: "textpart",
        "normalized part: {} -> {} bytes, {} newlines",
        input.len(), stripped.content.len(), stripped.newline_offsets.len()
    );
    NormalizedPart {
        content: stripped.content,
        stats: stripped.stats,
        exceptions,
    }
}

/// Zero-length `Newline` exceptions at each recorded offset.
pub fn newline_exceptions(stripped: &StrippedText) -> Vec<ProcessException> {
    stripped
        .newline_offsets
        .iter()
        .map(|&pos| ProcessException {
            pos,
            len: 0,
            kind: ExceptionKind::Newline,
        })
        .collect()
}

/// Merge exception lists and sort once by offset for downstream
/// consumption.
pub fn merge_exceptions(
    mut first: Vec<ProcessException>,
    second: Vec<ProcessException>,
) -> Vec<ProcessException> {
    first.extend(second);
    first.sort_by_key(|e| e.pos);
    first
}

/// Levenshtein distance over word-hash sequences with substitution cost 2
/// and insertion/deletion cost 1, so `distance / total_words` is a
/// comparable 0..1 dissimilarity ratio.
///
/// Returns `None` (comparison skipped) when the combined length exceeds
/// [`MAX_WORDS`].
pub fn words_levenshtein_distance(w1: &[u64], w2: &[u64]) -> Option<usize> {
    let s1 = w1.len();
    let s2 = w2.len();
    if s1 + s2 > MAX_WORDS {
        log::warn!(
            target: "textpart",
            "cannot compare parts with more than {MAX_WORDS} words: {}", s1 + s2
        );
        return None;
    }

    let mut column: Vec<usize> = (0..=s1).collect();
    for x in 1..=s2 {
        column[0] = x;
        let mut lastdiag = x - 1;
        for y in 1..=s1 {
            let olddiag = column[y];
            let substitution = if w1[y - 1] == w2[x - 1] { 0 } else { 2 };
            column[y] = (column[y] + 1)
                .min(column[y - 1] + 1)
                .min(lastdiag + substitution);
            lastdiag = olddiag;
        }
    }
    Some(column[s1])
}
