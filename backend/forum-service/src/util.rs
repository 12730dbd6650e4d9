//! Small helpers shared across the service: uid generation, tag parsing,
//! character-safe truncation, client IP extraction, and the text-to-HTML
//! transform applied to post bodies.

use actix_web::HttpRequest;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Generate a random lowercase alphanumeric uid of the given length.
pub fn get_uid(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(|c| (c as char).to_ascii_lowercase())
        .collect()
}

/// Split a comma-separated tag string into a lowercased, deduplicated set,
/// preserving first-seen order.
pub fn split_tags(tag_val: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for raw in tag_val.split(',') {
        let tag = raw.trim().to_lowercase();
        if !tag.is_empty() && !seen.contains(&tag) {
            seen.push(tag);
        }
    }
    seen
}

/// Truncate a string to at most `max_chars` characters, never splitting a
/// UTF-8 code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Render post content to HTML.
///
/// Markdown rendering proper is an external collaborator; this stands in as
/// the opaque text transform the rest of the system depends on: it escapes
/// HTML metacharacters and turns blank-line-separated blocks into
/// paragraphs.
pub fn render_html(content: &str) -> String {
    let escaped: String = content
        .chars()
        .map(|c| match c {
            '&' => "&amp;".to_string(),
            '<' => "&lt;".to_string(),
            '>' => "&gt;".to_string(),
            '"' => "&quot;".to_string(),
            other => other.to_string(),
        })
        .collect();

    escaped
        .split("\n\n")
        .filter(|block| !block.trim().is_empty())
        .map(|block| format!("<p>{}</p>", block.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extract the viewer's IP address from the request.
///
/// Prefers the first entry of X-Forwarded-For, then the peer address.
/// 'localhost' is not a usable address; falls back to 0.0.0.0 so a view
/// event can always be keyed.
pub fn client_ip(req: &HttpRequest) -> String {
    let peer = req
        .peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_default();
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .unwrap_or_default();

    let peer = if peer.eq_ignore_ascii_case("localhost") {
        String::new()
    } else {
        peer
    };
    let forwarded = if forwarded.eq_ignore_ascii_case("localhost") {
        String::new()
    } else {
        forwarded
    };

    if !forwarded.is_empty() {
        forwarded
    } else if !peer.is_empty() {
        peer
    } else {
        "0.0.0.0".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn uid_has_requested_length() {
        let uid = get_uid(13);
        assert_eq!(uid.len(), 13);
        assert!(uid.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(uid, uid.to_lowercase());
    }

    #[test]
    fn tags_are_lowercased_and_deduplicated() {
        let tags = split_tags("RNA-seq, alignment,  ,rna-seq,Galaxy");
        assert_eq!(tags, vec!["rna-seq", "alignment", "galaxy"]);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("hello", 80), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        // Multibyte characters must not be split.
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }

    #[test]
    fn html_rendering_escapes_and_wraps() {
        let html = render_html("a < b\n\nsecond & third");
        assert_eq!(html, "<p>a &lt; b</p>\n<p>second &amp; third</p>");
    }

    #[test]
    fn client_ip_prefers_forwarded_header() {
        let req = TestRequest::default()
            .insert_header(("x-forwarded-for", "10.0.0.1, 10.0.0.2"))
            .to_http_request();
        assert_eq!(client_ip(&req), "10.0.0.1");
    }

    #[test]
    fn client_ip_falls_back_to_sentinel() {
        let req = TestRequest::default().to_http_request();
        assert_eq!(client_ip(&req), "0.0.0.0");
    }
}
