//! Markup parsing and serialization for [`Document`].
//!
//! The parser is forgiving rather than conformant: it never fails, skips
//! comments, doctypes and processing instructions, ignores `html`/`body`
//! wrappers (the document root already is the body), and closes unbalanced
//! elements at the nearest matching open tag.

use crate::dom::{Document, NodeId, NodeKind};

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];
const RAW_TEXT_TAGS: &[&str] = &["script", "style"];
const WRAPPER_TAGS: &[&str] = &["html", "body"];

/// Parse markup into a new document.
pub fn parse(input: &str) -> Document {
    let mut doc = Document::new();
    let root = doc.root();
    parse_into(&mut doc, root, input);
    doc
}

/// Parse markup and append the result under `parent`.
pub fn parse_into(doc: &mut Document, parent: NodeId, input: &str) {
    let bytes = input.as_bytes();
    let mut stack: Vec<(NodeId, String)> = vec![(parent, String::new())];
    let mut idx = 0usize;

    while idx < bytes.len() {
        if bytes[idx] != b'<' {
            let next = find_byte(bytes, idx, b'<').unwrap_or(bytes.len());
            append_text(doc, top(&stack, parent), &decode_entities(&input[idx..next]));
            idx = next;
            continue;
        }

        if bytes[idx..].starts_with(b"<!--") {
            idx = find_seq(bytes, idx + 4, b"-->").map_or(bytes.len(), |end| end + 3);
            continue;
        }

        if bytes[idx..].starts_with(b"<!") || bytes[idx..].starts_with(b"<?") {
            idx = find_byte(bytes, idx, b'>').map_or(bytes.len(), |end| end + 1);
            continue;
        }

        let Some((tag, next_idx)) = parse_tag(input, idx) else {
            append_text(doc, top(&stack, parent), "<");
            idx += 1;
            continue;
        };
        idx = next_idx;

        if WRAPPER_TAGS.contains(&tag.name.as_str()) {
            continue;
        }

        if tag.is_end {
            if let Some(pos) = stack.iter().rposition(|(_, name)| *name == tag.name) {
                if pos > 0 {
                    stack.truncate(pos);
                }
            }
            continue;
        }

        let element = doc.create_element(&tag.name);
        for (name, value) in &tag.attributes {
            doc.set_attribute(element, name, value);
        }
        doc.append_child(top(&stack, parent), element);

        if tag.self_closing || VOID_TAGS.contains(&tag.name.as_str()) {
            continue;
        }

        if RAW_TEXT_TAGS.contains(&tag.name.as_str()) {
            let (raw, after) = read_raw_text(input, idx, &tag.name);
            append_text(doc, element, raw);
            idx = after;
            continue;
        }

        stack.push((element, tag.name));
    }
}

fn top(stack: &[(NodeId, String)], parent: NodeId) -> NodeId {
    stack.last().map_or(parent, |(id, _)| *id)
}

fn append_text(doc: &mut Document, parent: NodeId, text: &str) {
    if text.is_empty() {
        return;
    }
    let node = doc.create_text(text);
    doc.append_child(parent, node);
}

// =============================================================================
// Tags
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
struct ParsedTag {
    name: String,
    attributes: Vec<(String, String)>,
    is_end: bool,
    self_closing: bool,
}

fn parse_tag(input: &str, start: usize) -> Option<(ParsedTag, usize)> {
    let bytes = input.as_bytes();
    let mut idx = start + 1;
    let mut is_end = false;
    if bytes.get(idx) == Some(&b'/') {
        is_end = true;
        idx += 1;
    }

    let name_start = idx;
    while idx < bytes.len() && is_name_char(bytes[idx]) {
        idx += 1;
    }
    if idx == name_start || !bytes[name_start].is_ascii_alphabetic() {
        return None;
    }
    let name = input[name_start..idx].to_ascii_lowercase();

    let mut attributes = Vec::new();
    let mut self_closing = false;

    loop {
        idx = skip_spaces(bytes, idx);
        match bytes.get(idx) {
            None => return None,
            Some(b'>') => {
                idx += 1;
                break;
            }
            Some(b'/') => {
                self_closing = true;
                idx += 1;
            }
            Some(_) => {
                let attr_start = idx;
                while idx < bytes.len() && is_name_char(bytes[idx]) {
                    idx += 1;
                }
                if idx == attr_start {
                    // Junk inside the tag; step over it.
                    idx += 1;
                    continue;
                }
                let attr_name = input[attr_start..idx].to_ascii_lowercase();
                idx = skip_spaces(bytes, idx);

                let mut value = String::new();
                if bytes.get(idx) == Some(&b'=') {
                    idx = skip_spaces(bytes, idx + 1);
                    let (raw, after) = read_attribute_value(input, idx)?;
                    value = decode_entities(raw);
                    idx = after;
                }
                attributes.push((attr_name, value));
            }
        }
    }

    Some((
        ParsedTag {
            name,
            attributes,
            is_end,
            self_closing,
        },
        idx,
    ))
}

fn read_attribute_value(input: &str, start: usize) -> Option<(&str, usize)> {
    let bytes = input.as_bytes();
    match bytes.get(start) {
        Some(&quote) if quote == b'"' || quote == b'\'' => {
            let end = find_byte(bytes, start + 1, quote)?;
            Some((&input[start + 1..end], end + 1))
        }
        Some(_) => {
            let mut idx = start;
            while idx < bytes.len() && !bytes[idx].is_ascii_whitespace() && bytes[idx] != b'>' {
                idx += 1;
            }
            Some((&input[start..idx], idx))
        }
        None => None,
    }
}

fn read_raw_text<'a>(input: &'a str, start: usize, tag_name: &str) -> (&'a str, usize) {
    let closing = format!("</{}", tag_name);
    let lower = input[start..].to_ascii_lowercase();
    match lower.find(&closing) {
        Some(offset) => {
            let end = start + offset;
            let after = find_byte(input.as_bytes(), end, b'>').map_or(input.len(), |gt| gt + 1);
            (&input[start..end], after)
        }
        None => (&input[start..], input.len()),
    }
}

fn is_name_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b':')
}

fn skip_spaces(bytes: &[u8], mut idx: usize) -> usize {
    while idx < bytes.len() && bytes[idx].is_ascii_whitespace() {
        idx += 1;
    }
    idx
}

fn find_byte(bytes: &[u8], start: usize, needle: u8) -> Option<usize> {
    bytes[start..].iter().position(|&b| b == needle).map(|p| start + p)
}

fn find_seq(bytes: &[u8], start: usize, needle: &[u8]) -> Option<usize> {
    bytes[start.min(bytes.len())..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| start + p)
}

// =============================================================================
// Entities
// =============================================================================

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').and_then(|semi| {
            let ch = match &rest[1..semi] {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" | "#39" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                other => other
                    .strip_prefix('#')
                    .and_then(|num| match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => num.parse().ok(),
                    })
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, semi))
        });
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

// =============================================================================
// Serialization
// =============================================================================

/// Serialize the children of the document root.
pub fn serialize(doc: &Document) -> String {
    let mut out = String::new();
    for &child in doc.children(doc.root()) {
        write_node(doc, child, false, &mut out);
    }
    out
}

fn write_node(doc: &Document, node: NodeId, raw: bool, out: &mut String) {
    match doc.kind(node) {
        NodeKind::Text(text) if raw => out.push_str(text),
        NodeKind::Text(text) => escape_into(text, false, out),
        NodeKind::Element(element) => {
            out.push('<');
            out.push_str(&element.tag);
            if let Some(id) = &element.id {
                write_attribute("id", id, out);
            }
            if !element.classes.is_empty() {
                write_attribute("class", &element.classes.join(" "), out);
            }
            for (name, value) in &element.attributes {
                write_attribute(name, value, out);
            }
            out.push('>');

            if VOID_TAGS.contains(&element.tag.as_str()) {
                return;
            }

            let raw_children = RAW_TEXT_TAGS.contains(&element.tag.as_str());
            for &child in doc.children(node) {
                write_node(doc, child, raw_children, out);
            }
            out.push_str("</");
            out.push_str(&element.tag);
            out.push('>');
        }
    }
}

fn write_attribute(name: &str, value: &str, out: &mut String) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    escape_into(value, true, out);
    out.push('"');
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}
