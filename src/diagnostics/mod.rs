//! Mapping parse errors back onto the template the author wrote.
//!
//! The parser only ever sees the assembled source, full of placeholder
//! tokens. The [`Remapper`] rebuilds a *display source* in which each
//! interpolation is shown as `${expression}` (or `${index}` when the
//! expression text is unknown) and translates offsets from one to the
//! other, so that a [`Diagnostic`] points at the right column.

use std::fmt;

use crate::assemble::{Assembly, Splice, Template};
use crate::ast::span::Span;
use crate::error::ParseError;

/// A parse failure rendered against the display source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    /// Which renderer reported it, e.g. `html` or `jsx`.
    pub tag: String,
    /// Primary location in the display source.
    pub span: Span,
    /// 1-based line and column of the primary location.
    pub line: usize,
    pub column: usize,
    pub label: Option<String>,
    pub code_frame: String,
    pub help: Option<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.message)?;
        write!(f, " --> {} template:{}:{}", self.tag, self.line, self.column)?;
        if let Some(label) = &self.label {
            write!(f, "\n{label}")?;
        }
        write!(f, "\n{}", self.code_frame)?;
        if let Some(help) = &self.help {
            write!(f, "\nhelp: {help}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

#[derive(Debug, Clone)]
struct MappedSpan {
    assembled: Span,
    display: Span,
    token: String,
}

/// Translates offsets in the assembled source into the display source.
#[derive(Debug, Clone)]
pub struct Remapper {
    display: String,
    spans: Vec<MappedSpan>,
}

impl Remapper {
    pub fn new(template: &Template<'_>, assembly: &Assembly) -> Self {
        let mut display = String::new();
        let mut spans = Vec::new();
        let mut interpolations = assembly.interpolations().iter();

        let slots = template.interpolation_count();
        for (index, segment) in template.strings().iter().enumerate() {
            display.push_str(segment);
            if index >= slots {
                break;
            }

            let start = display.len();
            match template.source_of(index) {
                Some(src) => display.push_str(&format!("${{{src}}}")),
                None => display.push_str(&format!("${{{index}}}")),
            }
            if let Some(interpolation) = interpolations.next() {
                // verbatim tag names are real markup, not tokens to hide
                let token = match interpolation.splice {
                    Splice::TagName => String::new(),
                    Splice::Placeholder | Splice::Binding => assembly
                        .source()
                        .get(interpolation.span.start..interpolation.span.end)
                        .unwrap_or("")
                        .to_string(),
                };
                spans.push(MappedSpan {
                    assembled: interpolation.span,
                    display: Span::new(start, display.len()),
                    token,
                });
            }
        }

        Self { display, spans }
    }

    pub fn display_source(&self) -> &str {
        &self.display
    }

    /// Map an offset in the assembled source to the display source.
    ///
    /// Offsets strictly inside a spliced token map to the same relative
    /// position inside its `${...}` text, clamped to that text. Offsets
    /// elsewhere shift by the accumulated length difference. The result
    /// always lies within the display source.
    pub fn map_offset(&self, offset: usize) -> usize {
        let mut shifted = offset as isize;
        for mapped in &self.spans {
            if offset <= mapped.assembled.start {
                break;
            }
            if offset < mapped.assembled.end {
                let inner = offset - mapped.assembled.start;
                return self.clamp(mapped.display.start + inner.min(mapped.display.len()));
            }
            shifted = offset as isize + mapped.display.end as isize - mapped.assembled.end as isize;
        }
        self.clamp(shifted.max(0) as usize)
    }

    pub fn map_span(&self, span: Span) -> Span {
        Span::new(self.map_offset(span.start), self.map_offset(span.end))
    }

    /// Display text covered by an assembled-source span.
    pub fn snippet(&self, span: Span) -> &str {
        let mapped = self.map_span(span);
        self.display.get(mapped.start..mapped.end).unwrap_or("")
    }

    /// Render a parse error against the display source.
    pub fn diagnostic(&self, error: &ParseError, tag: &str) -> Diagnostic {
        let span = self.map_span(error.span());
        let (line, column) = offset_to_line_col(&self.display, span.start);
        let labels: Vec<Span> = error.labels.iter().map(|l| self.map_span(l.span)).collect();
        let label = error
            .labels
            .iter()
            .find_map(|l| l.message.as_deref())
            .map(|text| self.rewrite(text));

        Diagnostic {
            message: self.rewrite(&error.message),
            tag: tag.to_string(),
            span,
            line,
            column,
            label,
            code_frame: code_frame(&self.display, &labels),
            help: error.hint.clone(),
        }
    }

    /// Replace spliced tokens quoted in a message with their display text.
    fn rewrite(&self, text: &str) -> String {
        self.spans
            .iter()
            .filter(|mapped| !mapped.token.is_empty())
            .fold(text.to_string(), |acc, mapped| {
                let shown = &self.display[mapped.display.start..mapped.display.end];
                acc.replace(&mapped.token, shown)
            })
    }

    fn clamp(&self, offset: usize) -> usize {
        let mut offset = offset.min(self.display.len());
        while !self.display.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }
}

/// 1-based line and column (in characters) of a byte offset.
pub fn offset_to_line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;
    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

/// Render a code frame for `labels` over `source`.
///
/// Shows every labelled line plus one line of context on each side,
/// with a `^` marker row under each labelled line. A zero-width label
/// is drawn as a single `^`.
pub fn code_frame(source: &str, labels: &[Span]) -> String {
    let lines: Vec<&str> = source.split('\n').map(|l| l.trim_end_matches('\r')).collect();

    // ((line, column), (line, column)) per label, 0-based, columns in chars
    let locate = |byte: usize| -> (usize, usize) {
        let (line, col) = offset_to_line_col(source, byte);
        (line - 1, col - 1)
    };
    let marks: Vec<((usize, usize), (usize, usize))> = labels
        .iter()
        .map(|span| (locate(span.start), locate(span.end.max(span.start))))
        .collect();

    let Some(first) = marks.iter().map(|(start, _)| start.0).min() else {
        return String::new();
    };
    let last = marks.iter().map(|(_, end)| end.0).max().unwrap_or(first);
    let from = first.saturating_sub(1);
    let to = (last + 1).min(lines.len().saturating_sub(1));

    let width = (to + 1).to_string().len();
    let gutter = " ".repeat(width);
    let mut out = vec![format!("{gutter} |")];

    for (index, text) in lines.iter().enumerate().take(to + 1).skip(from) {
        if text.is_empty() {
            out.push(format!("{:>width$} |", index + 1));
        } else {
            out.push(format!("{:>width$} | {text}", index + 1));
        }

        let line_len = text.chars().count();
        let mut pointer: Vec<char> = Vec::new();
        for &((start_line, start_col), (end_line, end_col)) in &marks {
            if index < start_line || index > end_line {
                continue;
            }
            let from_col = if index == start_line { start_col } else { 0 };
            let to_col = if index == end_line { end_col } else { line_len };
            let to_col = to_col.max(from_col + 1);
            if pointer.len() < to_col {
                pointer.resize(to_col, ' ');
            }
            for slot in &mut pointer[from_col..to_col] {
                *slot = '^';
            }
        }
        if !pointer.is_empty() {
            let pointer: String = pointer.into_iter().collect();
            out.push(format!("{gutter} | {}", pointer.trim_end()));
        }
    }

    out.join("\n")
}
