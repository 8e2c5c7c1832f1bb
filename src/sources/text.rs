// src/sources/text.rs
//! Text helpers for provider payloads: headline normalization and keyword extraction.

use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::HashMap;

const MAX_HEADLINE_CHARS: usize = 300;

fn re_tags() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"))
}

fn re_ws() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"))
}

/// Decode entities, strip tags, normalize quotes, collapse whitespace, cap length.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();
    out = re_tags().replace_all(&out, "").to_string();

    // “ ” ‘ ’ « » → ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    out = re_ws().replace_all(&out, " ").trim().to_string();

    if out.chars().count() > MAX_HEADLINE_CHARS {
        out = out.chars().take(MAX_HEADLINE_CHARS).collect();
    }
    out
}

/// Lower-case alphanumeric tokens.
pub fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .map(|t| t.trim_matches('\''))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn is_stopword(tok: &str) -> bool {
    matches!(
        tok,
        "the" | "a" | "an" | "and" | "or" | "but" | "of" | "to" | "in" | "on" | "for"
            | "with" | "at" | "by" | "from" | "as" | "is" | "are" | "was" | "were" | "be"
            | "been" | "it" | "its" | "this" | "that" | "these" | "those" | "how" | "what"
            | "why" | "who" | "will" | "can" | "new" | "after" | "about" | "into" | "over"
            | "says" | "say" | "said" | "has" | "have" | "had" | "not" | "you" | "your"
            | "we" | "our" | "they" | "their" | "he" | "she" | "his" | "her" | "more"
            | "than" | "up" | "out" | "just" | "now" | "all" | "s"
    )
}

/// Most frequent non-stopword tokens across `texts`, excluding tokens of the topic
/// itself. Ties are broken alphabetically so the output is stable.
pub fn top_keywords<'a, I>(texts: I, topic: &str, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let topic_tokens: Vec<String> = tokenize(topic).collect();
    let mut freq: HashMap<String, usize> = HashMap::new();
    for text in texts {
        for tok in tokenize(text) {
            if tok.chars().count() < 3 || is_stopword(&tok) || topic_tokens.contains(&tok) {
                continue;
            }
            if tok.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            *freq.entry(tok).or_insert(0) += 1;
        }
    }
    let mut ranked: Vec<(String, usize)> = freq.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(limit).map(|(k, _)| k).collect()
}

/// Keep the first occurrence of each item (case-insensitive), preserving order.
pub fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .filter(|s| seen.insert(s.trim().to_lowercase()))
        .collect()
}
