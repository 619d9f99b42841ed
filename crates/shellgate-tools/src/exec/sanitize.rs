//! Output sanitization: ANSI stripping and markup escaping

/// Strip ANSI escape sequences and carriage returns.
pub(crate) fn strip_ansi_escapes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            if chars.peek() == Some(&'[') {
                // CSI: ESC [ params final
                chars.next();
                while let Some(&next) = chars.peek() {
                    if next.is_ascii() && (0x20..=0x3F).contains(&(next as u8)) {
                        chars.next();
                    } else {
                        break;
                    }
                }
                if let Some(&next) = chars.peek() {
                    if next.is_ascii() && (0x40..=0x7E).contains(&(next as u8)) {
                        chars.next();
                    }
                }
            } else if chars.peek() == Some(&']') {
                // OSC: ESC ] ... (BEL | ESC \)
                chars.next();
                while let Some(c) = chars.next() {
                    if c == '\x07' {
                        break;
                    }
                    if c == '\x1b' && chars.peek() == Some(&'\\') {
                        chars.next();
                        break;
                    }
                }
            } else {
                chars.next();
            }
        } else if c == '\r' {
            continue;
        } else {
            result.push(c);
        }
    }
    result
}

/// Escape text so it renders literally inside HTML. Newlines and tabs pass
/// through; other control characters become visible `\xNN` sequences.
pub fn escape_markup(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + s.len() / 8);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '\n' | '\t' => out.push(c),
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// Turn captured bytes into display-safe text. `omitted` is the number of
/// bytes dropped by the capture limit.
pub(crate) fn sanitize_output(raw: &[u8], omitted: u64) -> String {
    let text = String::from_utf8_lossy(raw);
    let mut out = escape_markup(&strip_ansi_escapes(&text));
    if omitted > 0 {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&format!("[output truncated: {} bytes omitted]", omitted));
    }
    out
}
