//! Answer record templates.
//!
//! A template is the A and TXT answer shared by every key of a set. It is
//! written after the `:` directive marker:
//!
//! ```text
//! :127.0.0.2:Listed, see https://example.org/lookup?ip=$
//! : A 127.0.0.4
//! :3 Spam source $
//! ```
//!
//! A single number `N` is shorthand for `127.0.0.N`, and an empty A value
//! means `127.0.0.2`. Every `$` in the TXT text is replaced by the queried
//! address when the answer is rendered.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;

use crate::addr;
use crate::error::TemplateError;

/// A value used when a template gives none.
pub const DEFAULT_A: Ipv4Addr = Ipv4Addr::new(127, 0, 0, 2);

/// Process-wide fallback template, `127.0.0.2` without TXT.
///
/// Sets that never see a directive line answer with this. It is handed to
/// the finalizer explicitly through [`crate::SetConfig`].
pub static DEFAULT_RECORD: Lazy<Arc<RecordTemplate>> =
    Lazy::new(|| Arc::new(RecordTemplate::default()));

/// Parsed A/TXT answer template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordTemplate {
    a: Ipv4Addr,
    txt: Option<String>,
}

impl RecordTemplate {
    /// Create a template from its parts. An empty TXT is treated as none.
    ///
    /// Applies the same checks as [`parse`](Self::parse), so every template
    /// can be written as a directive line and read back unchanged.
    pub fn new(a: Ipv4Addr, txt: Option<&str>) -> Result<Self, TemplateError> {
        if a.octets()[0] != 127 {
            return Err(TemplateError::NotLoopback(a));
        }
        let txt = txt.map(str::trim).filter(|t| !t.is_empty());
        if txt.is_some_and(|t| t.chars().any(|c| c.is_control() && c != '\t')) {
            return Err(TemplateError::ControlCharacter);
        }
        Ok(Self {
            a,
            txt: txt.map(String::from),
        })
    }

    /// Parse template text, with or without the leading `:` marker.
    ///
    /// Directive lines are passed here whole, marker included, so a line
    /// `::text` has an empty A value and TXT `text`.
    pub fn parse(text: &str) -> Result<Self, TemplateError> {
        let body = text.trim_start();
        let body = body.strip_prefix(':').unwrap_or(body).trim_start();
        let body = strip_type_keyword(body);

        let end = body
            .find(|c: char| c == ':' || c.is_ascii_whitespace())
            .unwrap_or(body.len());
        let (value, rest) = body.split_at(end);

        let a = parse_a_value(value)?;

        // One separator, then the rest of the line is TXT
        let txt = rest.strip_prefix(':').unwrap_or(rest);
        Self::new(a, Some(txt))
    }

    /// The A record address.
    pub fn a(&self) -> Ipv4Addr {
        self.a
    }

    /// The raw TXT text, before substitution.
    pub fn txt(&self) -> Option<&str> {
        self.txt.as_deref()
    }

    /// Render the TXT text, replacing every `$` with `subst` if given.
    pub fn render_txt(&self, subst: Option<&str>) -> Option<String> {
        let txt = self.txt.as_deref()?;
        Some(match subst {
            Some(value) => txt.replace('$', value),
            None => txt.to_string(),
        })
    }

    /// The directive line that reproduces this template.
    pub fn to_directive(&self) -> String {
        format!(":{}", self)
    }
}

impl Default for RecordTemplate {
    fn default() -> Self {
        Self { a: DEFAULT_A, txt: None }
    }
}

impl fmt::Display for RecordTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.txt {
            Some(txt) => write!(f, "{}:{}", self.a, txt),
            None => write!(f, "{}", self.a),
        }
    }
}

impl std::str::FromStr for RecordTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RecordTemplate {
    type Error = TemplateError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<RecordTemplate> for String {
    fn from(t: RecordTemplate) -> Self {
        t.to_string()
    }
}

/// Skip an optional `A` record-type keyword.
fn strip_type_keyword(body: &str) -> &str {
    let mut chars = body.chars();
    match (chars.next(), chars.next()) {
        (Some('A' | 'a'), None) => "",
        (Some('A' | 'a'), Some(c)) if c.is_ascii_whitespace() => body[1..].trim_start(),
        _ => body,
    }
}

fn parse_a_value(value: &str) -> Result<Ipv4Addr, TemplateError> {
    if value.is_empty() {
        return Ok(DEFAULT_A);
    }
    if let Some(key) = addr::parse(value) {
        return Ok(Ipv4Addr::from(key));
    }
    match value.parse::<u8>() {
        Ok(last) if value.bytes().all(|b| b.is_ascii_digit()) => Ok(Ipv4Addr::new(127, 0, 0, last)),
        _ => Err(TemplateError::InvalidAValue(value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full() {
        let t = RecordTemplate::parse(":127.0.0.3:Listed $").unwrap();
        assert_eq!(t.a(), Ipv4Addr::new(127, 0, 0, 3));
        assert_eq!(t.txt(), Some("Listed $"));
    }

    #[test]
    fn test_parse_keyword_form() {
        let t = RecordTemplate::parse(": A 127.0.0.2").unwrap();
        assert_eq!(t, RecordTemplate::default());

        let t = RecordTemplate::parse("a 127.0.0.9 blocked").unwrap();
        assert_eq!(t.a(), Ipv4Addr::new(127, 0, 0, 9));
        assert_eq!(t.txt(), Some("blocked"));
    }

    #[test]
    fn test_parse_shorthand_and_empty() {
        let t = RecordTemplate::parse(":4 spam").unwrap();
        assert_eq!(t.a(), Ipv4Addr::new(127, 0, 0, 4));
        assert_eq!(t.txt(), Some("spam"));

        let t = RecordTemplate::parse("::only text").unwrap();
        assert_eq!(t.a(), DEFAULT_A);
        assert_eq!(t.txt(), Some("only text"));

        assert_eq!(RecordTemplate::parse(":").unwrap(), RecordTemplate::default());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            RecordTemplate::parse(":blocked"),
            Err(TemplateError::InvalidAValue("blocked".to_string()))
        );
        assert_eq!(
            RecordTemplate::parse(":10.0.0.1:x"),
            Err(TemplateError::NotLoopback(Ipv4Addr::new(10, 0, 0, 1)))
        );
        assert!(RecordTemplate::parse(":300").is_err());
    }

    #[test]
    fn test_new_validates() {
        let t = RecordTemplate::new(Ipv4Addr::new(127, 0, 0, 3), Some("  hit $ ")).unwrap();
        assert_eq!(t.txt(), Some("hit $"));
        assert_eq!(RecordTemplate::new(DEFAULT_A, Some("")).unwrap(), RecordTemplate::default());

        assert_eq!(
            RecordTemplate::new(Ipv4Addr::new(10, 0, 0, 1), None),
            Err(TemplateError::NotLoopback(Ipv4Addr::new(10, 0, 0, 1)))
        );
        assert_eq!(
            RecordTemplate::new(DEFAULT_A, Some("line1\nline2 $")),
            Err(TemplateError::ControlCharacter)
        );
        assert!(RecordTemplate::new(DEFAULT_A, Some("a\tb")).is_ok());
    }

    #[test]
    fn test_render_txt() {
        let t = RecordTemplate::parse(":2:See lookup?ip=$ ($)").unwrap();
        assert_eq!(
            t.render_txt(Some("10.0.0.1")).as_deref(),
            Some("See lookup?ip=10.0.0.1 (10.0.0.1)")
        );
        assert_eq!(t.render_txt(None).as_deref(), Some("See lookup?ip=$ ($)"));
        assert_eq!(RecordTemplate::default().render_txt(Some("1.2.3.4")), None);
    }

    #[test]
    fn test_directive_reparses() {
        let t = RecordTemplate::parse(":127.0.0.5:Listed: see $").unwrap();
        assert_eq!(t.to_directive(), ":127.0.0.5:Listed: see $");
        assert_eq!(RecordTemplate::parse(&t.to_directive()).unwrap(), t);
    }

    #[test]
    fn test_serde_as_string() {
        let t: RecordTemplate = serde_yaml::from_str("\"127.0.0.3:hit $\"").unwrap();
        assert_eq!(t.txt(), Some("hit $"));
        assert!(serde_yaml::from_str::<RecordTemplate>("\"8.8.8.8\"").is_err());
    }
}
