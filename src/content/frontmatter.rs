//! Front-matter parsing

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};

use super::ItemKind;
use crate::error::ContentError;

const YAML_FENCE: &str = "---";
const YAML_END: &str = "...";
const JSON_FENCE: &str = ";;;";

/// Metadata block syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Syntax {
    Yaml,
    Json,
}

/// Typed front-matter of a post or page.
///
/// Recognized keys get named fields; everything else is kept, in authored
/// order, in `extra`.
#[derive(Debug, Clone, PartialEq)]
pub struct FrontMatter {
    pub title: String,
    pub date: Option<DateTime<FixedOffset>>,
    pub updated: Option<DateTime<FixedOffset>>,
    pub tags: Vec<String>,
    pub menu: Option<String>,
    pub weight: Option<i64>,
    pub draft: bool,
    pub permalink: Option<String>,
    pub layout: Option<ItemKind>,

    /// Additional custom fields
    pub extra: IndexMap<String, Value>,
}

impl FrontMatter {
    /// Front-matter with only a title set
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            date: None,
            updated: None,
            tags: Vec::new(),
            menu: None,
            weight: None,
            draft: false,
            permalink: None,
            layout: None,
            extra: IndexMap::new(),
        }
    }

    /// Parse front-matter from content string.
    /// Returns (front_matter, remaining_content). Dates without an offset
    /// are resolved in `tz`.
    pub fn parse(content: &str, tz: Tz) -> Result<(Self, &str), ContentError> {
        let (syntax, block, body) = split(content)?;
        let mapping = match syntax {
            Syntax::Yaml => parse_yaml_block(block)?,
            Syntax::Json => parse_json_block(block)?,
        };
        let fm = Self::from_mapping(mapping, tz)?;
        Ok((fm, body))
    }

    fn from_mapping(mapping: Mapping, tz: Tz) -> Result<Self, ContentError> {
        let mut title = None;
        let mut fm = FrontMatter::new(String::new());

        for (key, value) in mapping {
            let key = match key {
                Value::String(key) => key,
                other => {
                    return Err(ContentError::MalformedFrontMatter(format!(
                        "keys must be strings, found {}",
                        describe(&other)
                    )))
                }
            };

            match key.as_str() {
                "title" => title = optional_string("title", &value)?,
                "date" => fm.date = optional_date("date", &value, tz)?,
                "updated" => fm.updated = optional_date("updated", &value, tz)?,
                "tags" => fm.tags = parse_tags(&value)?,
                "menu" => fm.menu = optional_string("menu", &value)?,
                "weight" => {
                    fm.weight = match &value {
                        Value::Null => None,
                        Value::Number(n) => Some(n.as_i64().ok_or_else(|| {
                            ContentError::invalid("weight", "expected an integer")
                        })?),
                        other => {
                            return Err(ContentError::invalid(
                                "weight",
                                format!("expected an integer, found {}", describe(other)),
                            ))
                        }
                    }
                }
                "draft" => {
                    fm.draft = match &value {
                        Value::Null => false,
                        Value::Bool(b) => *b,
                        other => {
                            return Err(ContentError::invalid(
                                "draft",
                                format!("expected a boolean, found {}", describe(other)),
                            ))
                        }
                    }
                }
                "permalink" => fm.permalink = optional_string("permalink", &value)?,
                "layout" => match value.as_str().and_then(ItemKind::from_layout) {
                    Some(kind) => fm.layout = Some(kind),
                    // Theme-specific layouts are passed through untouched
                    None => {
                        fm.extra.insert(key, value);
                    }
                },
                _ => {
                    fm.extra.insert(key, value);
                }
            }
        }

        let title = title.ok_or_else(|| ContentError::missing("title"))?;
        if title.trim().is_empty() {
            return Err(ContentError::invalid("title", "must not be empty"));
        }
        fm.title = title;

        Ok(fm)
    }

    /// Serialize to a YAML mapping in a stable key order
    pub fn to_mapping(&self) -> Mapping {
        let mut map = Mapping::new();
        map.insert("title".into(), self.title.clone().into());
        if let Some(date) = &self.date {
            map.insert("date".into(), date.to_rfc3339().into());
        }
        if let Some(updated) = &self.updated {
            map.insert("updated".into(), updated.to_rfc3339().into());
        }
        if !self.tags.is_empty() {
            let tags = self.tags.iter().cloned().map(Value::from).collect();
            map.insert("tags".into(), Value::Sequence(tags));
        }
        if let Some(menu) = &self.menu {
            map.insert("menu".into(), menu.clone().into());
        }
        if let Some(weight) = self.weight {
            map.insert("weight".into(), weight.into());
        }
        if self.draft {
            map.insert("draft".into(), true.into());
        }
        if let Some(permalink) = &self.permalink {
            map.insert("permalink".into(), permalink.clone().into());
        }
        if let Some(layout) = self.layout {
            map.insert("layout".into(), layout.as_str().into());
        }
        for (key, value) in &self.extra {
            map.insert(key.clone().into(), value.clone());
        }
        map
    }

    /// Render the full file text: a `---` delimited YAML block followed by `body`
    pub fn render(&self, body: &str) -> Result<String, serde_yaml::Error> {
        let yaml = serde_yaml::to_string(&Value::Mapping(self.to_mapping()))?;
        Ok(format!("{}\n{}{}\n{}", YAML_FENCE, yaml, YAML_FENCE, body))
    }
}

/// Locate the metadata block. Returns the syntax, the block text and the body
/// that follows the closing fence.
fn split(content: &str) -> Result<(Syntax, &str, &str), ContentError> {
    let content = content.trim_start_matches('\u{feff}').trim_start();

    let (first_line, rest) = next_line(content);
    let syntax = match first_line.trim_end() {
        YAML_FENCE => Syntax::Yaml,
        JSON_FENCE => Syntax::Json,
        _ => return Err(ContentError::MissingFrontMatter),
    };

    let mut offset = 0;
    let mut remaining = rest;
    while !remaining.is_empty() {
        let (line, after) = next_line(remaining);
        let marker = line.trim_end();
        let closes = match syntax {
            Syntax::Yaml => marker == YAML_FENCE || marker == YAML_END,
            Syntax::Json => marker == JSON_FENCE,
        };
        if closes {
            return Ok((syntax, &rest[..offset], after));
        }
        offset += remaining.len() - after.len();
        remaining = after;
    }

    Err(ContentError::MalformedFrontMatter(
        "unterminated front-matter block".to_string(),
    ))
}

/// Split off the first line; the terminator belongs to neither half
fn next_line(s: &str) -> (&str, &str) {
    match s.find('\n') {
        Some(pos) => (s[..pos].trim_end_matches('\r'), &s[pos + 1..]),
        None => (s, ""),
    }
}

fn parse_yaml_block(block: &str) -> Result<Mapping, ContentError> {
    if block.trim().is_empty() {
        return Ok(Mapping::new());
    }
    let value: Value = serde_yaml::from_str(block)
        .map_err(|e| ContentError::MalformedFrontMatter(e.to_string()))?;
    into_mapping(value)
}

fn parse_json_block(block: &str) -> Result<Mapping, ContentError> {
    if block.trim().is_empty() {
        return Ok(Mapping::new());
    }
    let json: serde_json::Value = serde_json::from_str(block)
        .map_err(|e| ContentError::MalformedFrontMatter(e.to_string()))?;
    let value = serde_yaml::to_value(json)
        .map_err(|e| ContentError::MalformedFrontMatter(e.to_string()))?;
    into_mapping(value)
}

fn into_mapping(value: Value) -> Result<Mapping, ContentError> {
    match value {
        Value::Mapping(map) => Ok(map),
        Value::Null => Ok(Mapping::new()),
        other => Err(ContentError::MalformedFrontMatter(format!(
            "expected key/value pairs, found {}",
            describe(&other)
        ))),
    }
}

/// Scalars are accepted as strings so `title: 404` stays a title
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn optional_string(field: &str, value: &Value) -> Result<Option<String>, ContentError> {
    if value.is_null() {
        return Ok(None);
    }
    scalar_string(value).map(Some).ok_or_else(|| {
        ContentError::invalid(field, format!("expected a string, found {}", describe(value)))
    })
}

fn optional_date(
    field: &str,
    value: &Value,
    tz: Tz,
) -> Result<Option<DateTime<FixedOffset>>, ContentError> {
    let Some(raw) = optional_string(field, value)? else {
        return Ok(None);
    };
    parse_date(&raw, tz)
        .map(Some)
        .ok_or_else(|| ContentError::invalid(field, format!("cannot parse {:?} as a date", raw)))
}

fn parse_tags(value: &Value) -> Result<Vec<String>, ContentError> {
    let items = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Sequence(items) => items,
        other => {
            return Err(ContentError::invalid(
                "tags",
                format!("expected a sequence of strings, found {}", describe(other)),
            ))
        }
    };

    let mut tags: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let tag = scalar_string(item).ok_or_else(|| {
            ContentError::invalid(
                "tags",
                format!("expected a sequence of strings, found {}", describe(item)),
            )
        })?;
        let tag = tag.trim().to_string();
        if tag.is_empty() {
            return Err(ContentError::invalid("tags", "tags must not be empty"));
        }
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    Ok(tags)
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Parse a date string in various formats.
///
/// Values carrying an offset keep it; naive values are placed in `tz`.
pub fn parse_date(s: &str, tz: Tz) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }

    let with_offset = [
        "%Y-%m-%d %H:%M:%S%:z",
        "%Y-%m-%d %H:%M:%S %:z",
        "%Y-%m-%d %H:%M:%S%z",
        "%Y-%m-%d %H:%M:%S %z",
        "%Y/%m/%d %H:%M:%S %:z",
    ];
    for fmt in with_offset {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    let naive = [
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    for fmt in naive {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return localize(dt, tz);
        }
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return localize(d.and_hms_opt(0, 0, 0)?, tz);
        }
    }

    None
}

fn localize(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<FixedOffset>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.fixed_offset())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn parse(content: &str) -> Result<(FrontMatter, &str), ContentError> {
        FrontMatter::parse(content, Tz::UTC)
    }

    #[test]
    fn test_parse_yaml_frontmatter() {
        let content = r#"---
title: Hello World
date: 2024-01-15 10:30:00
tags:
  - rust
  - ssg
menu: main
---

This is the content.
"#;

        let (fm, remaining) = parse(content).unwrap();
        assert_eq!(fm.title, "Hello World");
        assert_eq!(fm.tags, vec!["rust", "ssg"]);
        assert_eq!(fm.menu.as_deref(), Some("main"));
        assert!(!fm.draft);
        assert_eq!(remaining, "\nThis is the content.\n");
        let date = fm.date.unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2024, 1, 15));
        assert_eq!(date.hour(), 10);
        assert_eq!(date.offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_parse_json_frontmatter() {
        let content = ";;;\n{\"title\": \"Test Post\", \"tags\": [\"a\", \"b\"], \"draft\": true}\n;;;\nThis is content.\n";

        let (fm, remaining) = parse(content).unwrap();
        assert_eq!(fm.title, "Test Post");
        assert_eq!(fm.tags, vec!["a", "b"]);
        assert!(fm.draft);
        assert_eq!(remaining, "This is content.\n");
    }

    #[test]
    fn test_missing_frontmatter() {
        assert_eq!(
            parse("# Just a heading\n\nBody").unwrap_err(),
            ContentError::MissingFrontMatter
        );
        assert_eq!(parse("").unwrap_err(), ContentError::MissingFrontMatter);
    }

    #[test]
    fn test_unterminated_block() {
        let err = parse("---\ntitle: Oops\n\nno closing fence\n").unwrap_err();
        assert!(matches!(err, ContentError::MalformedFrontMatter(_)));
    }

    #[test]
    fn test_invalid_yaml_syntax() {
        let err = parse("---\ntitle: [unclosed\n---\nbody").unwrap_err();
        assert!(matches!(err, ContentError::MalformedFrontMatter(_)));
    }

    #[test]
    fn test_non_mapping_block() {
        let err = parse("---\n- just\n- a list\n---\nbody").unwrap_err();
        assert!(matches!(err, ContentError::MalformedFrontMatter(_)));
    }

    #[test]
    fn test_missing_title() {
        let err = parse("---\ndate: 2024-01-01\n---\n").unwrap_err();
        assert_eq!(err, ContentError::missing("title"));

        let err = parse("---\n---\nbody").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidField);
    }

    #[test]
    fn test_empty_title() {
        let err = parse("---\ntitle: '  '\n---\n").unwrap_err();
        assert!(matches!(err, ContentError::InvalidField { ref field, .. } if field == "title"));
    }

    #[test]
    fn test_invalid_date() {
        let err = parse("---\ntitle: A\ndate: next tuesday\n---\n").unwrap_err();
        assert!(matches!(err, ContentError::InvalidField { ref field, .. } if field == "date"));
    }

    #[test]
    fn test_tags_must_be_sequence() {
        let err = parse("---\ntitle: A\ntags: rust\n---\n").unwrap_err();
        assert!(matches!(err, ContentError::InvalidField { ref field, .. } if field == "tags"));

        let err = parse("---\ntitle: A\ntags:\n  - [nested]\n---\n").unwrap_err();
        assert!(matches!(err, ContentError::InvalidField { ref field, .. } if field == "tags"));
    }

    #[test]
    fn test_duplicate_tags_keep_first() {
        let (fm, _) = parse("---\ntitle: A\ntags: [b, a, b]\n---\n").unwrap();
        assert_eq!(fm.tags, vec!["b", "a"]);
    }

    #[test]
    fn test_draft_must_be_bool() {
        let err = parse("---\ntitle: A\ndraft: maybe\n---\n").unwrap_err();
        assert!(matches!(err, ContentError::InvalidField { ref field, .. } if field == "draft"));
    }

    #[test]
    fn test_unknown_fields_preserved_in_order() {
        let content = "---\ntitle: A\nzeta: 1\nalpha:\n  nested: true\nlayout: gallery\n---\n";
        let (fm, _) = parse(content).unwrap();
        let keys: Vec<_> = fm.extra.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "layout"]);
        assert_eq!(fm.layout, None);
    }

    #[test]
    fn test_layout_overrides_kind() {
        let (fm, _) = parse("---\ntitle: A\nlayout: post\nweight: 3\n---\n").unwrap();
        assert_eq!(fm.layout, Some(ItemKind::Post));
        assert_eq!(fm.weight, Some(3));
    }

    #[test]
    fn test_numeric_title() {
        let (fm, _) = parse("---\ntitle: 404\n---\n").unwrap();
        assert_eq!(fm.title, "404");
    }

    #[test]
    fn test_dot_terminator_and_crlf() {
        let (fm, body) = parse("---\r\ntitle: A\r\n...\r\nbody\r\n").unwrap();
        assert_eq!(fm.title, "A");
        assert_eq!(body, "body\r\n");
    }

    #[test]
    fn test_markdown_rule_in_body_is_untouched() {
        let content = "---\ntitle: A\n---\nintro\n\n---\n\nmore\n";
        let (_, body) = parse(content).unwrap();
        assert_eq!(body, "intro\n\n---\n\nmore\n");
    }

    #[test]
    fn test_parse_date_formats() {
        let utc = Tz::UTC;
        let dt = parse_date("2024-01-02T10:00:00+02:00", utc).unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 2 * 3600);

        let dt = parse_date("2024/01/02 10:00", utc).unwrap();
        assert_eq!(dt.hour(), 10);

        let dt = parse_date("2024-01-02 10:00:00 -05:00", utc).unwrap();
        assert_eq!(dt.offset().local_minus_utc(), -5 * 3600);

        assert!(parse_date("2024-13-40", utc).is_none());
    }

    #[test]
    fn test_naive_date_uses_timezone() {
        let dt = parse_date("2024-07-01", chrono_tz::Europe::Berlin).unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 2 * 3600);
        assert_eq!(dt.hour(), 0);
    }

    #[test]
    fn test_render_round_trip() {
        let mut fm = FrontMatter::new("yes");
        fm.date = parse_date("2024-01-02T03:04:05+01:00", Tz::UTC);
        fm.updated = parse_date("2024-02-01", Tz::UTC);
        fm.tags = vec!["x".to_string(), "true".to_string()];
        fm.menu = Some("main".to_string());
        fm.weight = Some(-2);
        fm.draft = true;
        fm.permalink = Some("custom/place".to_string());
        fm.layout = Some(ItemKind::Page);
        fm.extra.insert("cover".to_string(), Value::from("img.png"));

        let body = "Body with --- inside\n";
        let text = fm.render(body).unwrap();
        let (parsed, parsed_body) = parse(&text).unwrap();
        assert_eq!(parsed, fm);
        assert_eq!(parsed_body, body);
    }
}
