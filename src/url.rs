//! URL construction for Telegram Bot API calls (spec.md §4.5)
//!
//! Percent-encodes query values by hand rather than pulling in a full URL
//! crate — the original only ever builds `{base}/bot{token}/{method}?k=v&...`
//! and nothing fancier, so a small encoder grounded on RFC 3986's unreserved
//! set is all this needs.

const UNRESERVED: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_.~";

pub fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        if UNRESERVED.contains(&byte) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

/// The thumbs-up reaction literal `SetMessageReaction` sends (spec.md §4.5).
pub const THUMBS_UP_REACTION: &str = r#"[{"type":"emoji","emoji":"👍"}]"#;

/// Builds `{base}/bot{token}/{method}` with `params` appended as a query
/// string, each value percent-encoded.
pub fn build_url(base: &str, token: &str, method: &str, params: &[(&str, &str)]) -> String {
    let mut url = format!("{base}/bot{token}/{method}");
    for (i, (key, value)) in params.iter().enumerate() {
        url.push(if i == 0 { '?' } else { '&' });
        url.push_str(key);
        url.push('=');
        url.push_str(&percent_encode(value));
    }
    url
}

pub fn get_me(base: &str, token: &str) -> String {
    build_url(base, token, "getMe", &[])
}

pub fn get_updates(base: &str, token: &str, offset: Option<i64>) -> String {
    match offset {
        Some(offset) => build_url(base, token, "getUpdates", &[("offset", &offset.to_string())]),
        None => build_url(base, token, "getUpdates", &[]),
    }
}

pub fn send_message(base: &str, token: &str, chat_id: i64, text: &str) -> String {
    build_url(
        base,
        token,
        "sendMessage",
        &[("chat_id", &chat_id.to_string()), ("text", text)],
    )
}

pub fn set_message_reaction(base: &str, token: &str, chat_id: i64, message_id: i64) -> String {
    build_url(
        base,
        token,
        "setMessageReaction",
        &[
            ("chat_id", &chat_id.to_string()),
            ("message_id", &message_id.to_string()),
            ("reaction", THUMBS_UP_REACTION),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_encodes_reserved_bytes() {
        assert_eq!(percent_encode("a b/c"), "a%20b%2Fc");
    }

    #[test]
    fn get_me_has_no_query_string() {
        assert_eq!(get_me("https://api.telegram.org", "T123"), "https://api.telegram.org/botT123/getMe");
    }

    #[test]
    fn get_updates_includes_offset_when_given() {
        let url = get_updates("https://api.telegram.org", "T123", Some(42));
        assert_eq!(url, "https://api.telegram.org/botT123/getUpdates?offset=42");
    }

    #[test]
    fn send_message_encodes_text() {
        let url = send_message("https://api.telegram.org", "T123", 7, "hi there");
        assert_eq!(url, "https://api.telegram.org/botT123/sendMessage?chat_id=7&text=hi%20there");
    }
}
