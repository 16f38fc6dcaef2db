use std::borrow::Cow;

const REDACTED: &str = "REDACTED";

fn is_token_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || ch == '.'
}

/// Replaces JWT-shaped tokens (`eyJ...`) with a placeholder.
pub fn redact_bearer_tokens(input: &str) -> Cow<'_, str> {
    if !input.contains("eyJ") {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(idx) = rest.find("eyJ") {
        out.push_str(&rest[..idx]);
        rest = &rest[idx..];
        let consumed: usize = rest
            .chars()
            .take_while(|ch| is_token_char(*ch))
            .map(char::len_utf8)
            .sum();
        out.push_str(REDACTED);
        rest = &rest[consumed..];
    }
    out.push_str(rest);

    if out == input {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(out)
    }
}

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let nee = needle.as_bytes();
    if nee.is_empty() {
        return Some(0);
    }
    if nee.len() > hay.len() {
        return None;
    }
    (0..=hay.len() - nee.len()).find(|&i| hay[i..i + nee.len()].eq_ignore_ascii_case(nee))
}

fn redact_header_value(text: String, header: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text.as_str();
    loop {
        let Some(idx) = find_ascii_case_insensitive(rest, header) else {
            out.push_str(rest);
            break;
        };
        out.push_str(&rest[..idx + header.len()]);
        rest = &rest[idx + header.len()..];

        if let Some(stripped) = rest.strip_prefix(' ') {
            out.push(' ');
            rest = stripped;
        }

        let consumed: usize = rest
            .chars()
            .take_while(|ch| *ch != '\n' && *ch != '\r')
            .map(char::len_utf8)
            .sum();
        out.push_str(REDACTED);
        rest = &rest[consumed..];
    }
    out
}

fn redact_json_field(text: String, field: &str) -> String {
    let needle = format!("\"{field}\":\"");
    if !text.contains(&needle) {
        return text;
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text.as_str();
    while let Some(idx) = rest.find(&needle) {
        out.push_str(&rest[..idx + needle.len()]);
        rest = &rest[idx + needle.len()..];
        let end = rest.find('"').unwrap_or(rest.len());
        out.push_str(REDACTED);
        rest = &rest[end..];
    }
    out.push_str(rest);
    out
}

/// Strips credentials from text that may end up in logs or error messages:
/// authorization and cookie header lines, `accessToken` JSON fields, and
/// anything that looks like a JWT.
pub fn redact_secrets(input: &str) -> Cow<'_, str> {
    let mut value = redact_bearer_tokens(input).into_owned();

    value = redact_header_value(value, "authorization:");
    value = redact_header_value(value, "cookie:");
    value = redact_json_field(value, "accessToken");
    value = redact_json_field(value, "password");

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
    fn redact_secrets_redacts_authorization_header_line() {
        let input = "Authorization: abc.def.ghi\nOther: ok\n";
        let out = redact_secrets(input).to_string();
        assert_eq!(out, "Authorization: REDACTED\nOther: ok\n");
    }

    #[test]
    fn redact_secrets_redacts_jwt_anywhere() {
        let input = "error sending request for token eyJhbGciOiJIUzI1NiJ9.eyJzdWIiOiIxIn0.sig-_x done";
        let out = redact_secrets(input).to_string();
        assert_eq!(out, "error sending request for token REDACTED done");
    }

    #[test]
    fn redact_secrets_redacts_access_token_field() {
        let input = r#"{"data":{"accessToken":"opaque-123"}}"#;
        let out = redact_secrets(input).to_string();
        assert_eq!(out, r#"{"data":{"accessToken":"REDACTED"}}"#);
    }

    #[test]
    fn redact_secrets_borrows_clean_input() {
        let input = "connection refused";
        assert!(matches!(redact_secrets(input), Cow::Borrowed(_)));
    }
}
