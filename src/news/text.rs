// src/news/text.rs
use once_cell::sync::OnceCell;
use regex::Regex;

/// Clean article text for a chat message: decode entities, strip tags,
/// collapse runs of spaces, and keep at most one blank line between paragraphs.
pub fn clean_text(s: &str) -> String {
    static RE_BREAKS: OnceCell<Regex> = OnceCell::new();
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    static RE_SPACES: OnceCell<Regex> = OnceCell::new();
    static RE_BLANKS: OnceCell<Regex> = OnceCell::new();

    // <br> and </p> become line breaks before the remaining tags go away
    let re_breaks = RE_BREAKS.get_or_init(|| Regex::new(r"(?i)<br\s*/?>|</p\s*>").unwrap());
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[a-z][^>]*>").unwrap());
    let re_spaces = RE_SPACES.get_or_init(|| Regex::new(r"[ \t\u{00A0}]+").unwrap());
    let re_blanks = RE_BLANKS.get_or_init(|| Regex::new(r"\n\s*\n(\s*\n)*").unwrap());

    let out = re_breaks.replace_all(s, "\n");
    let out = re_tags.replace_all(&out, "");
    let out = html_escape::decode_html_entities(&out).replace("\r\n", "\n");
    let out = re_spaces.replace_all(&out, " ");

    let lines: Vec<&str> = out.lines().map(str::trim).collect();
    let joined = lines.join("\n");
    re_blanks.replace_all(joined.trim(), "\n\n").to_string()
}

/// Shorten `s` to at most `max_chars` characters, cutting on a word boundary
/// when one is close and marking the cut with an ellipsis.
pub fn excerpt(s: &str, max_chars: usize) -> String {
    let flat = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }

    let cut: String = flat.chars().take(max_chars.saturating_sub(1)).collect();
    let trimmed = match cut.rfind(' ') {
        Some(i) if i >= cut.len() / 2 => &cut[..i],
        _ => cut.as_str(),
    };
    format!("{}…", trimmed.trim_end_matches([',', ';', ':', '.', ' ']))
}
