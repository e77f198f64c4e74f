use crate::error::AgoraResult;
use itertools::Itertools;
use regex::RegexBuilder;

/// Converts rendered HTML into plain text, decoding entities and dropping all
/// markup. Used for email bodies and alert snippets.
pub fn plain_text_from_html(html: &str) -> AgoraResult<String> {
  // use usize::MAX as the line wrap length, since the mail transport handles
  // the wrapping for us
  let plain_text = html2text::from_read(html.as_bytes(), usize::MAX)?;
  Ok(plain_text.trim().to_string())
}

/// Masks every occurrence of a censored word with asterisks of the same
/// length, case insensitively. An empty word list returns the text unchanged.
pub fn censor_text(text: &str, censored_words: &[String]) -> String {
  let pattern = censored_words
    .iter()
    .filter(|word| !word.is_empty())
    .map(|word| regex::escape(word))
    .join("|");
  if pattern.is_empty() {
    return text.to_string();
  }

  match RegexBuilder::new(&pattern).case_insensitive(true).build() {
    Ok(regex) => regex
      .replace_all(text, |caps: &regex::Captures| {
        caps
          .get(0)
          .map(|matched| "*".repeat(matched.as_str().chars().count()))
          .unwrap_or_default()
      })
      .into_owned(),
    Err(_) => text.to_string(),
  }
}
