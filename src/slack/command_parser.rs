//! Parsing of Slack form bodies and of the free text typed after a bot mention.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;

/// Decodes a `application/x-www-form-urlencoded` component (`+` is a space).
///
/// # Errors
///
/// Returns an error if the decoded bytes are not UTF-8.
pub fn decode_url_component(input: &str) -> Result<String, String> {
    let spaced = input.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|s| s.to_string())
        .map_err(|e| format!("Failed to decode URL component: {e}"))
}

/// Splits a form body into decoded key/value pairs. Later keys win.
///
/// # Errors
///
/// Returns an error if a key or value cannot be decoded.
pub fn parse_form_data(form_data: &str) -> Result<HashMap<String, String>, String> {
    let mut map = HashMap::new();
    for pair in form_data.split('&').filter(|p| !p.is_empty()) {
        let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_url_component(raw_key).map_err(|e| format!("Failed to decode key: {e}"))?;
        let value =
            decode_url_component(raw_value).map_err(|e| format!("Failed to decode value: {e}"))?;
        map.insert(key, value);
    }
    Ok(map)
}

/// Removes leading `<@U123>` mentions.
#[must_use]
pub fn strip_mentions(text: &str) -> &str {
    static MENTION_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^(\s*<@[A-Z0-9]+(\|[^>]*)?>)+").expect("static regex compile"));
    match MENTION_RE.find(text) {
        Some(m) => text[m.end()..].trim(),
        None => text.trim(),
    }
}

/// Unwraps Slack link markup: `<https://a.com|a.com>` and `<https://a.com>`
/// become `https://a.com`. Other tokens are returned unchanged.
#[must_use]
pub fn unwrap_slack_link(token: &str) -> String {
    let Some(inner) = token.strip_prefix('<').and_then(|t| t.strip_suffix('>')) else {
        return token.to_string();
    };
    let target = inner.split('|').next().unwrap_or(inner);
    if let Some(address) = target.strip_prefix("mailto:") {
        return address.to_string();
    }
    target.to_string()
}

/// Splits text on whitespace, keeping double-quoted runs (straight or curly
/// quotes) together and unwrapping Slack links.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut had_quotes = false;

    for c in text.chars() {
        match c {
            '"' | '\u{201C}' | '\u{201D}' => {
                quoted = !quoted;
                had_quotes = true;
            }
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() || had_quotes {
                    tokens.push(unwrap_slack_link(&current));
                    current.clear();
                    had_quotes = false;
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() || had_quotes {
        tokens.push(unwrap_slack_link(&current));
    }
    tokens
}

/// Positional arguments and `key=value` options of a command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArgs {
    pub positional: Vec<String>,
    pub options: BTreeMap<String, String>,
}

impl ParsedArgs {
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut args = Self::default();
        for token in tokenize(text) {
            match token.split_once('=') {
                // URLs with query strings contain `=` but are positional.
                Some((key, value))
                    if !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') =>
                {
                    args.options.insert(key.to_lowercase(), value.to_string());
                }
                _ => args.positional.push(token),
            }
        }
        args
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.positional.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }
}
