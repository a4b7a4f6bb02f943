//! Free-text connection fields: `"B*3, C"` means three wires to `B` and one to `C`.

use crate::EdgeRef;

/// Parse a comma-separated connection field.
///
/// Each token is `NAME` or `NAME * COUNT`. Whitespace around the name, the
/// asterisk(s) and the count is ignored. A count that is missing, zero or not
/// a number falls back to 1. Repeated names are merged by adding their counts,
/// keeping the position of the first occurrence.
pub fn parse_connection_text(text: &str) -> Vec<EdgeRef> {
    let mut edges: Vec<EdgeRef> = Vec::new();

    for token in text.split(',') {
        let Some(edge) = parse_token(token) else {
            continue;
        };
        match edges.iter_mut().find(|e| e.name == edge.name) {
            Some(existing) => existing.count = existing.count.saturating_add(edge.count),
            None => edges.push(edge),
        }
    }

    edges
}

fn parse_token(token: &str) -> Option<EdgeRef> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    let Some((name, count)) = token.split_once('*') else {
        return Some(EdgeRef::single(token));
    };

    let name = name.trim();
    if name.is_empty() {
        log::warn!("ignoring connection token without a name: '{}'", token);
        return None;
    }

    let count = count.trim_start_matches(|c: char| c == '*' || c.is_whitespace()).trim();
    match count.parse::<u32>() {
        Ok(n) if n > 0 => Some(EdgeRef::new(name, n)),
        _ => {
            log::warn!("invalid count in connection token '{}', using 1", token);
            Some(EdgeRef::single(name))
        }
    }
}

/// Render a connection list back into the editable text form.
pub fn format_connection_list(edges: &[EdgeRef]) -> String {
    edges
        .iter()
        .map(|e| {
            if e.count > 1 {
                format!("{}*{}", e.name, e.count)
            } else {
                e.name.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
