//! Minimal PDF 1.4 writer for text reports.
//!
//! Pages are A4 portrait and use the built-in Courier faces, so tables are
//! laid out by padding cells to fixed character widths. Text outside ASCII is
//! transliterated where a close ASCII form exists and replaced by `?`
//! otherwise.

use std::fmt::Write as _;

const PAGE_WIDTH: u32 = 595;
const PAGE_HEIGHT: u32 = 842;
const MARGIN: u32 = 40;
const LEADING: u32 = 12;
const BODY_SIZE: u32 = 9;
const HEADING_SIZE: u32 = 12;
/// Characters per line at body size (Courier advance is 0.6 em).
pub const LINE_CHARS: usize = ((PAGE_WIDTH - 2 * MARGIN) * 10 / (BODY_SIZE * 6)) as usize;
/// Body lines per page, leaving one line for the footer.
const LINES_PER_PAGE: usize = ((PAGE_HEIGHT - 2 * MARGIN) / LEADING) as usize - 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    Body,
    Bold,
    Heading,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// Pads or truncates `text` to exactly `width` characters.
pub fn fit(text: &str, width: usize, align: Align) -> String {
    let count = text.chars().count();
    if count > width {
        let mut s: String = text.chars().take(width.saturating_sub(1)).collect();
        if width > 0 {
            s.push('~');
        }
        return s;
    }
    let pad = " ".repeat(width - count);
    match align {
        Align::Left => format!("{text}{pad}"),
        Align::Right => format!("{pad}{text}"),
    }
}

/// Joins fitted cells with a single space.
pub fn row(cells: &[(&str, usize, Align)]) -> String {
    cells
        .iter()
        .map(|(text, width, align)| fit(text, *width, *align))
        .collect::<Vec<_>>()
        .join(" ")
}

fn transliterate(ch: char) -> Option<&'static str> {
    Some(match ch {
        '–' | '—' => "-",
        '≤' => "<=",
        '≥' => ">=",
        '“' | '”' => "\"",
        '‘' | '’' => "'",
        '…' => "...",
        '\u{a0}' => " ",
        _ => return None,
    })
}

/// Escapes text for a PDF literal string.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            c => out.push_str(transliterate(c).unwrap_or("?")),
        }
    }
    out
}

#[derive(Debug, Default)]
pub struct PdfDocument {
    lines: Vec<(Style, String)>,
    footer: Option<String>,
}

impl PdfDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn heading(&mut self, text: impl Into<String>) -> &mut Self {
        self.lines.push((Style::Heading, text.into()));
        self
    }

    pub fn bold(&mut self, text: impl Into<String>) -> &mut Self {
        self.lines.push((Style::Bold, text.into()));
        self
    }

    pub fn line(&mut self, text: impl Into<String>) -> &mut Self {
        self.lines.push((Style::Body, text.into()));
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.line("")
    }

    pub fn rule(&mut self) -> &mut Self {
        self.line("-".repeat(LINE_CHARS))
    }

    /// Footer text printed on every page before the page number.
    pub fn footer(&mut self, text: impl Into<String>) -> &mut Self {
        self.footer = Some(text.into());
        self
    }

    pub fn page_count(&self) -> usize {
        self.lines.len().div_ceil(LINES_PER_PAGE).max(1)
    }

    fn page_stream(&self, lines: &[(Style, String)], page_no: usize, pages: usize) -> String {
        let mut s = String::new();
        let top = PAGE_HEIGHT - MARGIN;
        let _ = writeln!(s, "BT\n{LEADING} TL\n{MARGIN} {top} Td");
        for (style, text) in lines {
            let (font, size) = match style {
                Style::Body => ("F1", BODY_SIZE),
                Style::Bold => ("F2", BODY_SIZE),
                Style::Heading => ("F2", HEADING_SIZE),
            };
            let _ = writeln!(s, "/{font} {size} Tf\n({}) Tj\nT*", escape(text));
        }
        let _ = writeln!(s, "ET");

        let footer = match &self.footer {
            Some(f) => format!("{f} - Halaman {page_no} dari {pages}"),
            None => format!("Halaman {page_no} dari {pages}"),
        };
        let _ = writeln!(
            s,
            "BT\n/F1 8 Tf\n{MARGIN} {} Td\n({}) Tj\nET",
            MARGIN / 2,
            escape(&footer)
        );
        s
    }

    /// Serializes the document.
    pub fn render(&self) -> Vec<u8> {
        let pages = self.page_count();
        let chunks: Vec<&[(Style, String)]> = if self.lines.is_empty() {
            vec![&[]]
        } else {
            self.lines.chunks(LINES_PER_PAGE).collect()
        };

        // Objects: 1 catalog, 2 pages, 3 Courier, 4 Courier-Bold, then (page, content) pairs.
        let mut objects: Vec<String> = Vec::with_capacity(4 + pages * 2);
        let kids: Vec<String> = (0..pages).map(|i| format!("{} 0 R", 5 + i * 2)).collect();
        objects.push("<< /Type /Catalog /Pages 2 0 R >>".into());
        objects.push(format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            pages
        ));
        objects.push("<< /Type /Font /Subtype /Type1 /BaseFont /Courier >>".into());
        objects.push("<< /Type /Font /Subtype /Type1 /BaseFont /Courier-Bold >>".into());

        for (i, chunk) in chunks.iter().enumerate() {
            let content_id = 6 + i * 2;
            objects.push(format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
                 /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {content_id} 0 R >>"
            ));
            let stream = self.page_stream(chunk, i + 1, pages);
            objects.push(format!(
                "<< /Length {} >>\nstream\n{}endstream",
                stream.len(),
                stream
            ));
        }

        let mut out = String::from("%PDF-1.4\n");
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            let _ = write!(out, "{} 0 obj\n{}\nendobj\n", i + 1, body);
        }

        let xref_at = out.len();
        let _ = write!(out, "xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for off in offsets {
            let _ = write!(out, "{off:010} 00000 n \n");
        }
        let _ = write!(
            out,
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        );
        out.into_bytes()
    }
}
