use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;

#[allow(clippy::expect_used)]
static MENTIONS_REGEX: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"@(?P<name>[\w.-]+)").expect("compile mentions regex"));

#[allow(clippy::expect_used)]
static QUOTE_AUTHOR_REGEX: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r#"\[quote[^\]]*?\bauthor=(?:"(?P<quoted>[^"\]]+)"|(?P<bare>[^\s\]]+))"#)
    .expect("compile quote author regex")
});

/// Scans a post body for `@name` mentions and returns the deduplicated names
/// in order of first appearance. A trailing dot is part of the name charset,
/// so `@ann.` ends a sentence but scrapes as `ann.`; unresolvable names are
/// simply ignored by the caller.
pub fn scrape_text_for_mentions(text: &str) -> Vec<String> {
  MENTIONS_REGEX
    .captures_iter(text)
    .filter_map(|caps| caps.name("name").map(|name| name.as_str().to_string()))
    .unique()
    .collect()
}

/// Scans a post body for `[quote author=...]` blocks and returns the
/// deduplicated author names. Author names containing spaces must be written
/// in double quotes, which is how the composer emits them.
pub fn scrape_text_for_quoted_authors(text: &str) -> Vec<String> {
  QUOTE_AUTHOR_REGEX
    .captures_iter(text)
    .filter_map(|caps| {
      caps
        .name("quoted")
        .or_else(|| caps.name("bare"))
        .map(|name| name.as_str().to_string())
    })
    .unique()
    .collect()
}
