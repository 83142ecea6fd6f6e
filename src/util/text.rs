use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Ellipsis appended to truncated text
pub const ELLIPSIS: &str = "...";

/// Truncates a string to fit within `max_width` terminal columns.
///
/// Appends `...` when text is cut. Widths of 3 or fewer columns get as many
/// characters as fit with no ellipsis. Returns `Cow::Borrowed` when the
/// string already fits.
///
/// ```
/// use quire::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Short", 10), "Short");
/// assert_eq!(truncate_to_width("Hello World", 8), "Hello...");
/// assert_eq!(truncate_to_width("Test", 2), "Te");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if UnicodeWidthStr::width(s) <= max_width {
        return Cow::Borrowed(s);
    }

    let ellipsis_width = ELLIPSIS.len();
    let (budget, suffix) = if max_width <= ellipsis_width {
        (max_width, "")
    } else {
        (max_width - ellipsis_width, ELLIPSIS)
    };

    let mut used = 0;
    let mut end = 0;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        end = idx + c.len_utf8();
    }

    Cow::Owned(format!("{}{}", &s[..end], suffix))
}

/// Removes terminal control characters and ANSI escape sequences.
///
/// Post titles and bodies are written by the admin but rendered raw in the
/// terminal, so escape sequences must not reach it. Tab, newline and
/// carriage return are kept.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    fn is_control(c: char) -> bool {
        (c.is_control() && c != '\t' && c != '\n' && c != '\r') || c == '\x1b'
    }

    if !s.chars().any(is_control) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            match chars.peek() {
                // CSI: parameters until a final byte in 0x40..=0x7e
                Some('[') => {
                    chars.next();
                    for n in chars.by_ref() {
                        if ('\x40'..='\x7e').contains(&n) {
                            break;
                        }
                    }
                }
                // OSC: until BEL or ST
                Some(']') => {
                    chars.next();
                    while let Some(n) = chars.next() {
                        if n == '\x07' {
                            break;
                        }
                        if n == '\x1b' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            }
        } else if !is_control(c) {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// Converts an HTML post body to plain text.
///
/// Tags are dropped, `<script>`/`<style>` bodies skipped, block-level
/// closers (`</p>`, `<br>`, headings, list items) become newlines, and the
/// common named and numeric entities are decoded. Not a full HTML parser:
/// post bodies come from the rich-text editor and stay well-formed.
pub fn html_to_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(lt) = rest.find('<') {
        decode_entities_into(&rest[..lt], &mut out);
        let after = &rest[lt + 1..];
        let Some(gt) = after.find('>') else {
            // Unterminated tag: keep the remainder as text
            decode_entities_into(&rest[lt..], &mut out);
            rest = "";
            break;
        };

        let tag = after[..gt].trim();
        let name: String = tag
            .trim_start_matches('/')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        rest = &after[gt + 1..];

        if !tag.starts_with('/') && (name == "script" || name == "style") {
            let closer = format!("</{}", name);
            match rest.to_ascii_lowercase().find(&closer) {
                Some(pos) => {
                    let skip = rest[pos..].find('>').map(|g| pos + g + 1).unwrap_or(rest.len());
                    rest = &rest[skip..];
                }
                None => rest = "",
            }
            continue;
        }

        let breaks_line = matches!(
            name.as_str(),
            "br" | "p" | "div" | "li" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "blockquote" | "pre"
        );
        if breaks_line && (tag.starts_with('/') || name == "br") && !out.ends_with('\n') {
            out.push('\n');
        }
    }
    decode_entities_into(rest, &mut out);

    out.trim().to_string()
}

fn decode_entities_into(text: &str, out: &mut String) {
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let decoded = after
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&after[..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &after[semi + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" | "#39" => Some('\''),
        "nbsp" => Some(' '),
        "mdash" => Some('\u{2014}'),
        "ndash" => Some('\u{2013}'),
        "hellip" => Some('\u{2026}'),
        _ => {
            let num = entity.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Plain-text excerpt of an HTML body: at most `max_chars` characters,
/// followed by `...` when cut.
pub fn excerpt(html: &str, max_chars: usize) -> String {
    if html.is_empty() {
        return String::new();
    }
    let text = html_to_text(html);
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &flat[..cut], ELLIPSIS),
        None => flat,
    }
}
