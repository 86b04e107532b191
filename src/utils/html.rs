// src/utils/html.rs

/// Sanitizes model-generated text before it is placed in an email body.
///
/// Whitelist-based: safe tags such as `<b>` or `<p>` survive, `<script>`,
/// `<iframe>` and event-handler attributes are stripped. Line breaks are
/// kept as `<br>` since completions are plain text.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(&input.trim().replace('\n', "<br>"))
}

/// Escapes user-submitted text so it renders literally.
pub fn escape_text(input: &str) -> String {
    ammonia::clean_text(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_html_strips_scripts_and_keeps_breaks() {
        let out = clean_html("Linha 1\nLinha 2<script>alert(1)</script>");
        assert!(out.contains("Linha 1<br>Linha 2"));
        assert!(!out.contains("script"));
    }

    #[test]
    fn test_escape_text() {
        let out = escape_text("<b>A</b>");
        assert!(out.starts_with("&lt;b&gt;A"));
        assert!(!out.contains('<'));
    }
}
