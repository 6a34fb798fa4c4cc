// src/commands.rs
//! Chat command parsing and dispatch.

use std::sync::Arc;

use metrics::counter;

use crate::news::{format, ArticleId, NewsApi};
use crate::notify::{media, MediaFetcher};
use crate::subscriptions::SubscriptionRegistry;
use crate::transport::{ChatId, ChatTransport, InboundMessage, OutgoingContent};

/// Number of headlines for `!latest` and `!breaking`.
pub const LIST_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Subscribe,
    Unsubscribe,
    Latest,
    Breaking,
    /// Query with collapsed whitespace; may be empty.
    Search(String),
    /// Article id; may be empty.
    Read(String),
    Help,
}

impl Command {
    /// Parse a raw message body. Non-commands yield `None`.
    ///
    /// Only the command word is case-folded; the argument is kept verbatim
    /// because article ids are opaque and may be case-sensitive (`!read AB12`
    /// looks up `AB12`). Search queries only get whitespace runs collapsed.
    pub fn parse(raw: &str) -> Option<Self> {
        let text = raw.trim();
        let (head, rest) = match text.find(char::is_whitespace) {
            Some(i) => (&text[..i], text[i..].trim()),
            None => (text, ""),
        };
        let head = head.to_lowercase();

        let cmd = match head.as_str() {
            "!search" => Command::Search(collapse_ws(rest)),
            "!read" => Command::Read(rest.to_string()),
            _ if !rest.is_empty() => return None,
            "!notify" | "!start" => Command::Subscribe,
            "!stop" => Command::Unsubscribe,
            "!latest" => Command::Latest,
            "!breaking" => Command::Breaking,
            "!help" => Command::Help,
            _ => return None,
        };
        Some(cmd)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Subscribe => "subscribe",
            Command::Unsubscribe => "unsubscribe",
            Command::Latest => "latest",
            Command::Breaking => "breaking",
            Command::Search(_) => "search",
            Command::Read(_) => "read",
            Command::Help => "help",
        }
    }
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Short stable digest of a message body, so logs never carry raw text.
pub(crate) fn body_digest(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

pub struct CommandRouter {
    news: Arc<dyn NewsApi>,
    registry: Arc<SubscriptionRegistry>,
    media: Arc<dyn MediaFetcher>,
    transport: Arc<dyn ChatTransport>,
}

impl CommandRouter {
    pub fn new(
        news: Arc<dyn NewsApi>,
        registry: Arc<SubscriptionRegistry>,
        media: Arc<dyn MediaFetcher>,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        Self {
            news,
            registry,
            media,
            transport,
        }
    }

    /// Handle one inbound message: reply to its chat when it is a command.
    /// Returns `true` when a reply was sent.
    pub async fn handle(&self, msg: &InboundMessage) -> bool {
        if msg.from_me {
            return false;
        }
        let Some(reply) = self.reply_for(&msg.from, &msg.body).await else {
            return false;
        };
        match self.transport.send(&msg.from, &reply).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(target: "commands", chat = %msg.from, error = %e, "reply failed");
                false
            }
        }
    }

    /// Compute the reply for `text` from `from` without sending it.
    pub async fn reply_for(&self, from: &ChatId, text: &str) -> Option<OutgoingContent> {
        let cmd = Command::parse(text)?;
        counter!("commands_total", "command" => cmd.name()).increment(1);
        tracing::info!(
            target: "commands",
            chat = %from,
            command = cmd.name(),
            body = %body_digest(text),
            "command received"
        );

        let reply = match cmd {
            Command::Subscribe => {
                let added = self.registry.subscribe(from.clone());
                text_reply(if added {
                    format::SUBSCRIBED
                } else {
                    format::ALREADY_SUBSCRIBED
                })
            }
            Command::Unsubscribe => {
                let removed = self.registry.unsubscribe(from);
                text_reply(if removed {
                    format::UNSUBSCRIBED
                } else {
                    format::NOT_SUBSCRIBED
                })
            }
            Command::Latest => match self.news.latest(LIST_LIMIT).await {
                Ok(items) => OutgoingContent::Text(format::latest_list(&items)),
                Err(e) => self.failed("latest", e, format::ERR_NEWS),
            },
            Command::Breaking => match self.news.breaking(LIST_LIMIT).await {
                Ok(items) => OutgoingContent::Text(format::breaking_list(&items)),
                Err(e) => self.failed("breaking", e, format::ERR_BREAKING),
            },
            Command::Search(query) if query.is_empty() => text_reply(format::USAGE_SEARCH),
            Command::Search(query) => match self.news.search(&query).await {
                Ok(items) => OutgoingContent::Text(format::search_results(&query, &items)),
                Err(e) => self.failed("search", e, format::ERR_SEARCH),
            },
            Command::Read(id) if id.is_empty() => text_reply(format::USAGE_READ),
            Command::Read(id) => match self.news.article(&ArticleId::from(id)).await {
                Ok(article) => {
                    let text = format::full_article(&article);
                    media::with_thumbnail(self.media.as_ref(), text, article.thumbnail()).await
                }
                Err(e) => self.failed("read", e, format::ERR_ARTICLE),
            },
            Command::Help => text_reply(format::HELP_TEXT),
        };
        Some(reply)
    }

    fn failed(&self, command: &'static str, err: crate::news::NewsError, reply: &str) -> OutgoingContent {
        tracing::warn!(target: "commands", command, error = %err, "news api call failed");
        text_reply(reply)
    }
}

fn text_reply(s: &str) -> OutgoingContent {
    OutgoingContent::Text(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_exact_commands_case_insensitively() {
        assert_eq!(Command::parse("!notify"), Some(Command::Subscribe));
        assert_eq!(Command::parse("  !START "), Some(Command::Subscribe));
        assert_eq!(Command::parse("!Stop"), Some(Command::Unsubscribe));
        assert_eq!(Command::parse("!LATEST"), Some(Command::Latest));
        assert_eq!(Command::parse("!breaking"), Some(Command::Breaking));
        assert_eq!(Command::parse("!help"), Some(Command::Help));
    }

    #[test]
    fn exact_commands_reject_trailing_words() {
        assert_eq!(Command::parse("!latest please"), None);
        assert_eq!(Command::parse("!stopnow"), None);
        assert_eq!(Command::parse("hello"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[test]
    fn prefix_commands_keep_argument_case() {
        assert_eq!(
            Command::parse("!SEARCH   Hello   World "),
            Some(Command::Search("Hello World".into()))
        );
        assert_eq!(Command::parse("!read Ab12"), Some(Command::Read("Ab12".into())));
        assert_eq!(Command::parse("!READ AB12"), Some(Command::Read("AB12".into())));
        assert_eq!(Command::parse("!search"), Some(Command::Search(String::new())));
        assert_eq!(Command::parse("!searching cats"), None);
    }

    #[test]
    fn body_digest_is_short_and_stable() {
        let a = body_digest("!search secret");
        assert_eq!(a.len(), 12);
        assert_eq!(a, body_digest("!search secret"));
        assert_ne!(a, body_digest("!search other"));
    }
}
