//! Original-filename extraction from `Content-Disposition`.

/// Parses a `Content-Disposition` header to extract the filename.
///
/// Handles:
/// - `inline; filename="example.pdf"`
/// - `inline; filename=example.pdf`
/// - `attachment; filename*=UTF-8''example%20file.pdf` (RFC 5987, preferred when present)
///
/// The name is returned exactly as sent: it is metadata to hand back to the
/// caller, not a path, so no sanitizing happens here.
pub(crate) fn parse_content_disposition(header: &str) -> Option<String> {
    if let Some(pos) = find_param(header, "filename*=") {
        let value = header[pos + "filename*=".len()..].trim();
        // charset'language'encoded_value
        if let Some(quote_pos) = value.find("''") {
            let encoded = &value[quote_pos + 2..];
            let end = encoded.find(';').unwrap_or(encoded.len());
            let encoded_name = encoded[..end].trim().trim_matches('"');
            if let Ok(decoded) = urlencoding::decode(encoded_name) {
                return Some(decoded.into_owned());
            }
        }
    }

    if let Some(pos) = find_param(header, "filename=") {
        let value = header[pos + "filename=".len()..].trim();

        if let Some(stripped) = value.strip_prefix('"') {
            return unquote(stripped);
        }
        let end = value.find(';').unwrap_or(value.len());
        let filename = value[..end].trim();
        if !filename.is_empty() {
            return Some(filename.to_string());
        }
    }

    None
}

/// Finds `name` as a parameter key (case-insensitive), not as a suffix of another key.
fn find_param(header: &str, name: &str) -> Option<usize> {
    let lower = header.to_ascii_lowercase();
    let mut from = 0;
    while let Some(offset) = lower[from..].find(name) {
        let pos = from + offset;
        let preceded_ok = lower[..pos]
            .chars()
            .next_back()
            .is_none_or(|c| c == ';' || c.is_whitespace());
        if preceded_ok {
            return Some(pos);
        }
        from = pos + name.len();
    }
    None
}

/// Reads a quoted-string body (after the opening quote), honoring `\"` escapes.
fn unquote(value: &str) -> Option<String> {
    let mut out = String::new();
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push(chars.next()?),
            '"' => return Some(out),
            c => out.push(c),
        }
    }
    None
}

/// Builds an inline `Content-Disposition` header value for `filename`.
///
/// Plain ASCII names go in `filename=`; anything that would need quoting or
/// is not ASCII goes in RFC 5987 `filename*=` form, which is ASCII-only.
#[must_use]
pub fn content_disposition_for(filename: &str) -> String {
    if filename.is_ascii() && !filename.contains(['"', '\\', ';']) {
        format!("inline; filename={filename}")
    } else {
        format!(
            "inline; filename*=utf-8''{}",
            urlencoding::encode(filename)
        )
    }
}
