use std::borrow::Cow;

const TOKEN_FIELDS: [&str; 2] = ["access_token", "refresh_token"];

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let nee = needle.as_bytes();
    if nee.is_empty() {
        return Some(0);
    }
    if nee.len() > hay.len() {
        return None;
    }

    (0..=hay.len() - nee.len()).find(|&i| {
        hay[i..i + nee.len()]
            .iter()
            .zip(nee)
            .all(|(a, b)| a.to_ascii_lowercase() == b.to_ascii_lowercase())
    })
}

fn is_token_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '~' | '+' | '/' | '=' | '%')
}

// True when `prefix` ends in an `Authorization` header name, ignoring the
// separator and quoting between it and the scheme.
fn ends_with_authorization(prefix: &str) -> bool {
    const NAME: &[u8] = b"authorization";
    let trimmed = prefix
        .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, ':' | '=' | '"' | '\''))
        .as_bytes();
    trimmed.len() >= NAME.len() && trimmed[trimmed.len() - NAME.len()..].eq_ignore_ascii_case(NAME)
}

// Replaces the credential of every `Authorization: Bearer <token>`, case-insensitively.
// A bare "bearer" in prose is left alone.
fn redact_bearer(text: &str) -> String {
    let marker = "bearer ";
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = find_ascii_case_insensitive(rest, marker) {
        let end = idx + marker.len();
        out.push_str(&rest[..end]);
        rest = &rest[end..];

        if !ends_with_authorization(&out[..out.len() - marker.len()]) {
            continue;
        }

        let consumed: usize = rest
            .chars()
            .take_while(|c| is_token_char(*c))
            .map(char::len_utf8)
            .sum();
        if consumed > 0 {
            out.push_str("REDACTED");
        }
        rest = &rest[consumed..];
    }
    out.push_str(rest);
    out
}

// `"field": "value"` in JSON bodies and `field=value` in form bodies.
fn redact_field(text: &str, field: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find(field) {
        let end = idx + field.len();
        out.push_str(&rest[..end]);
        rest = &rest[end..];

        let after_key = rest.trim_start_matches('"');
        let quote_len = rest.len() - after_key.len();
        let sep = after_key
            .char_indices()
            .find(|(_, c)| !c.is_whitespace());
        let Some((sep_idx, sep_char)) = sep else {
            continue;
        };
        if sep_char != ':' && sep_char != '=' {
            continue;
        }

        let value_start = quote_len + sep_idx + 1;
        out.push_str(&rest[..value_start]);
        rest = &rest[value_start..];

        let leading_ws: usize = rest
            .chars()
            .take_while(|c| c.is_whitespace())
            .map(char::len_utf8)
            .sum();
        out.push_str(&rest[..leading_ws]);
        rest = &rest[leading_ws..];

        if let Some(quoted) = rest.strip_prefix('"') {
            let close = quoted.find('"').unwrap_or(quoted.len());
            out.push_str("\"REDACTED");
            rest = &quoted[close..];
        } else {
            let consumed: usize = rest
                .chars()
                .take_while(|c| is_token_char(*c) && *c != '&')
                .map(char::len_utf8)
                .sum();
            out.push_str("REDACTED");
            rest = &rest[consumed..];
        }
    }
    out.push_str(rest);
    out
}

/// Masks bearer credentials and token fields before text reaches logs or error messages.
pub fn redact_secrets(input: &str) -> Cow<'_, str> {
    let mut value = redact_bearer(input);
    for field in TOKEN_FIELDS {
        if value.contains(field) {
            value = redact_field(&value, field);
        }
    }

    if value == input {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_secrets_masks_bearer_header_line() {
        let input = "Authorization: Bearer eyJhbGciOi.abc-123\nOther: ok\n";
        let out = redact_secrets(input).to_string();
        assert_eq!(out, "Authorization: Bearer REDACTED\nOther: ok\n");
    }

    #[test]
    fn redact_secrets_masks_debug_formatted_header() {
        let input = r#"headers: {"authorization": "Bearer a1.b2"}"#;
        let out = redact_secrets(input).to_string();
        assert_eq!(out, r#"headers: {"authorization": "Bearer REDACTED"}"#);
    }

    #[test]
    fn redact_secrets_keeps_bearer_in_prose() {
        let input = "bearer token invalid";
        assert!(matches!(redact_secrets(input), Cow::Borrowed(_)));
    }

    #[test]
    fn redact_secrets_masks_json_token_fields() {
        let input = r#"{"access_token": "aaa.bbb", "refresh_token":"r-1", "token_type":"bearer"}"#;
        let out = redact_secrets(input).to_string();
        assert!(!out.contains("aaa.bbb"));
        assert!(!out.contains("r-1"));
        assert!(out.contains(r#""access_token": "REDACTED""#));
        assert!(out.contains(r#""refresh_token":"REDACTED""#));
        assert!(out.contains(r#""token_type":"bearer""#));
    }

    #[test]
    fn redact_secrets_masks_form_fields() {
        let input = "grant=x&refresh_token=abc%2Fdef&next=1";
        let out = redact_secrets(input).to_string();
        assert_eq!(out, "grant=x&refresh_token=REDACTED&next=1");
    }

    #[test]
    fn redact_secrets_borrows_clean_input() {
        let input = "connection refused";
        assert!(matches!(redact_secrets(input), Cow::Borrowed(_)));
    }
}
