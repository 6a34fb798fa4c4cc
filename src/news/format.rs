// src/news/format.rs
//! Chat reply formatting. WhatsApp renders `*text*` as bold.

use std::fmt::Write as _;

use super::text::{clean_text, excerpt};
use super::Article;

pub const ERR_BREAKING: &str = "❌ Error fetching breaking news.";
pub const ERR_NEWS: &str = "❌ Error fetching news.";
pub const ERR_SEARCH: &str = "❌ Error searching news.";
pub const ERR_ARTICLE: &str = "❌ Error fetching that article.";
pub const NO_RESULTS: &str = "🔍 No results found.";
pub const NO_NEWS: &str = "📭 No news available right now.";

pub const USAGE_SEARCH: &str = "Usage: !search <keywords>";
pub const USAGE_READ: &str = "Usage: !read <article id>";

pub const SUBSCRIBED: &str =
    "✅ Subscribed! You'll get a message whenever a new article is published. Send !stop to opt out.";
pub const ALREADY_SUBSCRIBED: &str = "✅ You're already subscribed. Send !stop to opt out.";
pub const UNSUBSCRIBED: &str = "🔕 Unsubscribed. Send !notify to turn alerts back on.";
pub const NOT_SUBSCRIBED: &str = "🔕 You weren't subscribed. Send !notify to turn alerts on.";

pub const HELP_TEXT: &str = "*🤖 News Bot Commands*\n\n\
!latest - 5 latest headlines\n\
!breaking - 5 breaking stories\n\
!search <keywords> - top 3 matching articles\n\
!read <id> - full article\n\
!notify (or !start) - alerts for new articles\n\
!stop - stop alerts\n\
!help - this message";

/// Max articles shown for `!search`.
pub const SEARCH_LIMIT: usize = 3;
/// Excerpt length for push notifications.
pub const NOTIFICATION_EXCERPT_CHARS: usize = 300;

pub fn breaking_list(items: &[Article]) -> String {
    if items.is_empty() {
        return NO_NEWS.to_string();
    }
    let mut out = String::from("*🚨 Breaking News 🚨*\n\n");
    for a in items {
        let _ = writeln!(out, "📌 *{}*", a.headline.trim());
        if !a.url.is_empty() {
            let _ = writeln!(out, "🔗 {}", a.url);
        }
        out.push('\n');
    }
    out.trim_end().to_string()
}

pub fn latest_list(items: &[Article]) -> String {
    if items.is_empty() {
        return NO_NEWS.to_string();
    }
    let mut out = String::from("*📰 Latest News*\n\n");
    for a in items {
        let _ = writeln!(out, "Title: *{}*", a.headline.trim());
        if !a.url.is_empty() {
            let _ = writeln!(out, "🔗 {}", a.url);
        }
        out.push('\n');
    }
    out.trim_end().to_string()
}

/// Top [`SEARCH_LIMIT`] results, or [`NO_RESULTS`] when there are none.
pub fn search_results(query: &str, items: &[Article]) -> String {
    if items.is_empty() {
        return NO_RESULTS.to_string();
    }
    let mut out = format!("*🔎 Results for \"{query}\"*\n\n");
    for (i, a) in items.iter().take(SEARCH_LIMIT).enumerate() {
        let _ = write!(
            out,
            "{}. *{}*\n🆔 {}\n🔗 {}\n\n",
            i + 1,
            a.headline.trim(),
            a.id,
            a.url
        );
    }
    out.push_str("Send !read <id> for the full story.");
    out
}

pub fn full_article(a: &Article) -> String {
    let mut out = format!("*{}*\n", a.headline.trim());
    if let Some(date) = a.published_date.as_deref().filter(|d| !d.trim().is_empty()) {
        let _ = writeln!(out, "📅 {}", date.trim());
    }
    let body = a.full_text.as_deref().map(clean_text).unwrap_or_default();
    if !body.is_empty() {
        out.push('\n');
        out.push_str(&body);
        out.push('\n');
    }
    if !a.url.is_empty() {
        let _ = write!(out, "\n🔗 {}", a.url);
    }
    out.trim_end().to_string()
}

pub fn notification(a: &Article) -> String {
    let mut out = format!("*🆕 New Article*\n\n*{}*\n", a.headline.trim());
    if let Some(date) = a.published_date.as_deref().filter(|d| !d.trim().is_empty()) {
        let _ = writeln!(out, "📅 {}", date.trim());
    }
    if let Some(text) = a.full_text.as_deref() {
        let short = excerpt(&clean_text(text), NOTIFICATION_EXCERPT_CHARS);
        if !short.is_empty() {
            let _ = writeln!(out, "\n{short}");
        }
    }
    if !a.url.is_empty() {
        let _ = writeln!(out, "\n🔗 {}", a.url);
    }
    let _ = write!(out, "\nReply !read {} for the full story.", a.id);
    out
}
