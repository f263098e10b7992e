//! TEXT value escaping and content-line folding (RFC 5545 §3.3.11, §3.1).

/// Content lines longer than this many octets are folded.
const MAX_LINE_OCTETS: usize = 75;

/// Escape a TEXT value: backslash, semicolon, comma and newlines.
/// Other control characters (except tab) are dropped.
pub fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            ';' => escaped.push_str("\\;"),
            ',' => escaped.push_str("\\,"),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                escaped.push_str("\\n");
            }
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push('\t'),
            c if c.is_control() => {}
            c => escaped.push(c),
        }
    }

    escaped
}

/// Fold a content line into chunks of at most 75 octets, continuation lines
/// starting with a single space. Never splits a UTF-8 sequence.
pub fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }

    let mut folded = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut budget = MAX_LINE_OCTETS;
    let mut used = 0;

    for c in line.chars() {
        let width = c.len_utf8();
        if used + width > budget {
            folded.push_str("\r\n ");
            // The leading space counts against the continuation line.
            budget = MAX_LINE_OCTETS - 1;
            used = 0;
        }
        folded.push(c);
        used += width;
    }

    folded
}
