//! Fixed HTML-to-text utility used when a message carries only an HTML body.
//!
//! Deliberately small: block tags become newlines, remaining tags are
//! stripped, common entities are decoded, blank runs collapse to one.

/// Convert an HTML body to plain text.
pub fn html_to_text(html: &str) -> String {
    let mut text = html.to_string();

    // Remove script and style blocks wholesale
    text = remove_tag_block(&text, "script");
    text = remove_tag_block(&text, "style");

    // Convert block elements to newlines
    for tag in &["br", "BR", "br/", "br /"] {
        text = text.replace(&format!("<{tag}>"), "\n");
    }
    for tag in &["p", "div", "tr", "li", "h1", "h2", "h3", "h4", "h5", "h6"] {
        text = text.replace(&format!("<{tag}>"), "\n");
        text = text.replace(&format!("<{tag} "), "\n<");
        let upper = tag.to_uppercase();
        text = text.replace(&format!("<{upper}>"), "\n");
        text = text.replace(&format!("</{tag}>"), "\n");
        text = text.replace(&format!("</{upper}>"), "\n");
    }

    // Strip all remaining HTML tags
    let mut result = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }

    // Decode HTML entities
    result = result.replace("&amp;", "&");
    result = result.replace("&lt;", "<");
    result = result.replace("&gt;", ">");
    result = result.replace("&quot;", "\"");
    result = result.replace("&#39;", "'");
    result = result.replace("&apos;", "'");
    result = result.replace("&nbsp;", " ");
    result = result.replace("&#160;", " ");

    // Collapse multiple blank lines into at most one
    let mut prev_was_blank = false;
    let mut cleaned = String::with_capacity(result.len());
    for line in result.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !prev_was_blank {
                cleaned.push('\n');
                prev_was_blank = true;
            }
        } else {
            cleaned.push_str(trimmed);
            cleaned.push('\n');
            prev_was_blank = false;
        }
    }

    cleaned.trim().to_string()
}

/// Remove an entire tag block (e.g. `<script>…</script>`).
fn remove_tag_block(html: &str, tag: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut remaining = html;
    let open = format!("<{tag}");
    let close = format!("</{tag}>");

    while let Some(start) = remaining.to_lowercase().find(&open) {
        result.push_str(&remaining[..start]);
        let after = &remaining[start..];
        if let Some(end) = after.to_lowercase().find(&close) {
            remaining = &after[end + close.len()..];
        } else {
            // No closing tag: drop the rest
            remaining = "";
            break;
        }
    }
    result.push_str(remaining);
    result
}
