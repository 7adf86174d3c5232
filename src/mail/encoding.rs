//! Quoted-printable body encoding (RFC 2045) and encoded-word header
//! encoding (RFC 2047).

use std::fmt::Write as _;

/// Maximum encoded line length, soft break marker included.
const MAX_LINE_LENGTH: usize = 76;

/// Longest encoded word allowed by RFC 2047.
const MAX_WORD_LENGTH: usize = 75;

const WORD_PREFIX: &str = "=?utf-8?q?";
const WORD_SUFFIX: &str = "?=";

/// Visible (printing) US-ASCII.
const fn is_vchar(b: u8) -> bool {
    matches!(b, b'!'..=b'~')
}

/// Encodes `data` as quoted-printable text.
///
/// Line breaks (`\n`, `\r\n` or a lone `\r`) become CRLF hard breaks. Lines
/// longer than 76 columns are split with `=` soft breaks, and whitespace
/// before a hard break or at the end of input is escaped.
#[must_use]
pub fn encode_quoted_printable(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() + data.len() / 8);
    let mut col = 0;
    let mut prev_cr = false;

    for &b in data {
        if b == b'\n' || b == b'\r' {
            if b == b'\n' && prev_cr {
                prev_cr = false;
                continue;
            }
            prev_cr = b == b'\r';
            escape_trailing_whitespace(&mut out, &mut col);
            out.push_str("\r\n");
            col = 0;
            continue;
        }
        prev_cr = false;

        let literal = b == b' ' || b == b'\t' || (is_vchar(b) && b != b'=');
        let width = if literal { 1 } else { 3 };
        if col + width > MAX_LINE_LENGTH - 1 {
            out.push_str("=\r\n");
            col = 0;
        }
        if literal {
            out.push(char::from(b));
        } else {
            let _ = write!(out, "={b:02X}");
        }
        col += width;
    }
    escape_trailing_whitespace(&mut out, &mut col);

    out
}

fn escape_trailing_whitespace(out: &mut String, col: &mut usize) {
    let Some(last) = out.chars().next_back().filter(|c| *c == ' ' || *c == '\t') else {
        return;
    };
    // A soft break ends in "=\r\n", so `last` is always literal text here.
    out.pop();
    *col -= 1;
    if *col + 3 > MAX_LINE_LENGTH - 1 {
        out.push_str("=\r\n");
        *col = 0;
    }
    let _ = write!(out, "={:02X}", last as u32);
    *col += 3;
}

/// Encodes unstructured header text such as a subject.
///
/// Printable ASCII is kept readable, with `\` and `"` backslash-escaped.
/// Anything else switches the whole field to encoded words.
#[must_use]
pub fn encode_header_text(text: &str) -> String {
    if text.bytes().all(|b| b == b' ' || is_vchar(b)) {
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            if c == '\\' || c == '"' {
                out.push('\\');
            }
            out.push(c);
        }
        return out;
    }
    encode_words(text)
}

/// Encodes `text` as one or more `Q` encoded words joined by folding
/// whitespace. No UTF-8 sequence is split across words.
#[must_use]
pub fn encode_words(text: &str) -> String {
    let budget = MAX_WORD_LENGTH - WORD_PREFIX.len() - WORD_SUFFIX.len();
    let mut words = Vec::new();
    let mut payload = String::new();
    let mut buf = [0u8; 4];

    for c in text.chars() {
        let mut token = String::new();
        for &b in c.encode_utf8(&mut buf).as_bytes() {
            match b {
                b' ' => token.push('_'),
                b'=' | b'?' | b'_' => {
                    let _ = write!(token, "={b:02X}");
                }
                b if is_vchar(b) => token.push(char::from(b)),
                b => {
                    let _ = write!(token, "={b:02X}");
                }
            }
        }
        if !payload.is_empty() && payload.len() + token.len() > budget {
            words.push(std::mem::take(&mut payload));
        }
        payload.push_str(&token);
    }
    if !payload.is_empty() || words.is_empty() {
        words.push(payload);
    }

    words
        .iter()
        .map(|p| format!("{WORD_PREFIX}{p}{WORD_SUFFIX}"))
        .collect::<Vec<_>>()
        .join("\r\n ")
}
