//! Frame location and literal normalization.
//!
//! Accepted variants:
//! - header line terminated by `\n` or `\r\n`
//! - footer line `---` terminated by `\n` or `\r\n`
//!
//! A footer must start a line and must carry its line break. A buffer ending
//! in a bare `---` is treated as still accumulating.

/// Literal that opens every frame, followed by the protocol version.
pub const HEADER: &str = "PyON ";

/// Line that closes every frame.
pub const FOOTER: &str = "---";

/// One complete message extracted from the byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Message key from the header line (e.g. `units`, `log-update`).
    pub key: String,
    /// Message body with Python literals already rewritten as JSON.
    pub value: String,
}

/// Locate the first complete frame in `text`.
///
/// Returns the frame and the byte offset just past its footer line. Anything
/// before the header is junk that belongs to the consumed range. Returns
/// `None` when the header, the key terminator or the footer is missing.
pub fn find_frame(text: &str) -> Option<(Frame, usize)> {
    let header_start = text.find(HEADER)?;
    let line_start = header_start + HEADER.len();
    let line_end = line_start + text[line_start..].find('\n')?;

    let header_line = text[line_start..line_end].trim_end_matches('\r');
    // `<version> <key>`; a header without a key still frames so it can be consumed
    let key = header_line
        .split_once(' ')
        .map(|(_, key)| key)
        .unwrap_or_default();

    let body_start = line_end + 1;
    let (footer_start, footer_end) = find_footer(text, body_start)?;

    let mut body = &text[body_start..footer_start];
    if let Some(stripped) = body.strip_suffix('\n') {
        body = stripped.strip_suffix('\r').unwrap_or(stripped);
    }

    tracing::trace!(key, len = body.len(), "framed message");

    Some((
        Frame {
            key: key.to_string(),
            value: normalize_literals(body),
        },
        footer_end,
    ))
}

/// Find a footer line at or after `from`, which must itself be a line start.
///
/// Returns the offset of the footer and the offset just past its line break.
fn find_footer(text: &str, from: usize) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut search = from;

    while let Some(found) = text[search..].find(FOOTER) {
        let start = search + found;
        let after = start + FOOTER.len();
        let at_line_start = start == from || bytes[start - 1] == b'\n';

        if at_line_start {
            let rest = &text[after..];
            if rest.starts_with('\n') {
                return Some((start, after + 1));
            }
            if rest.starts_with("\r\n") {
                return Some((start, after + 2));
            }
        }

        search = start + 1;
    }

    None
}

/// Rewrite the Python literals `None`, `True` and `False` in value position
/// as their JSON spellings.
pub fn normalize_literals(raw: &str) -> String {
    raw.replace(": None", ": null")
        .replace(": True", ": true")
        .replace(": False", ": false")
}
