/// Turn an identifier into a short human-readable phrase.
///
/// Underscores and hyphens become spaces, camelCase and acronym boundaries
/// are split, and the result is sentence-cased:
/// `clientHTTPStatus` → `Client http status`, `X-Client-ID` → `X client id`.
pub fn humanize_identifier(name: &str) -> String {
    let chars: Vec<char> = name
        .chars()
        .map(|c| if c == '_' || c == '-' { ' ' } else { c })
        .collect();

    let mut spaced = String::with_capacity(chars.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower)
            {
                spaced.push(' ');
            }
        }
        spaced.push(c);
    }

    let trimmed = spaced.trim();
    let mut out = String::with_capacity(trimmed.len());
    let mut rest = trimmed.chars();
    if let Some(first) = rest.next() {
        out.extend(first.to_uppercase());
        out.extend(rest.flat_map(char::to_lowercase));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn humanizes_common_conventions() {
        let cases = [
            ("", ""),
            ("client id", "Client id"),
            ("client_id", "Client id"),
            ("_client_id_", "Client id"),
            ("clientId", "Client id"),
            ("ClientName", "Client name"),
            ("clientHTTPStatus", "Client http status"),
            ("HTTPResponse", "Http response"),
            ("StatusOK", "Status ok"),
            ("version2Name", "Version2 name"),
            ("CLIENT_ID", "Client id"),
            ("singleA", "Single a"),
            ("X-Client-ID", "X client id"),
        ];
        for (name, expected) in cases {
            assert_eq!(humanize_identifier(name), expected, "input: {name:?}");
        }
    }
}
