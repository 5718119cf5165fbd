//! GFF3/GTF attribute column parser
//!
//! Turns the free-form 9th column into an ordered key/value map.
//!
//! - GFF3 tokens look like `key=value`
//! - GTF tokens look like `key "value"`
//!
//! Tokens are separated by `;`. HTML entities are unescaped first, except
//! an escaped semicolon, which is kept percent-encoded (`%3B`) so it can not
//! split a value in two. Ensembl GFF3 prefixes `ID`/`Parent` values with
//! `gene:`/`transcript:`; the prefix is stripped and, when absent, used to
//! fill `gene_id`/`transcript_id`.

use crate::formats::gff::FileFormat;
use indexmap::IndexMap;
use log::warn;
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

pub const ID_KEY: &str = "ID";
pub const PARENT_KEY: &str = "Parent";
pub const GENE_ID_KEY: &str = "gene_id";
pub const TRANSCRIPT_ID_KEY: &str = "transcript_id";

static GFF3_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([^=\s]+)\s*=\s*(.*?)\s*$").expect("valid GFF3 pattern"));

static GTF_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*(\S+)\s+"([^"]*)""#).expect("valid GTF pattern"));

static ID_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+):(.+)$").expect("valid prefix pattern"));

static TRAILING_SEMICOLON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r";\s*$").expect("valid trailing pattern"));

/// What to do with an attribute token that does not parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributePolicy {
    /// Stop with an error
    FailFast,
    /// Log a warning, drop the token and keep going
    #[default]
    WarnAndSkip,
}

impl AttributePolicy {
    /// Parse from string (for CLI argument)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "fail-fast" | "strict" => Some(AttributePolicy::FailFast),
            "warn" | "warn-and-skip" | "default" => Some(AttributePolicy::WarnAndSkip),
            _ => None,
        }
    }
}

/// An attribute token that did not match its format's pattern
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{format} attribute token does not match key/value pattern: '{token}'")]
pub struct AttributeParseError {
    pub format: FileFormat,
    pub token: String,
}

/// Ordered attribute map of one annotation line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    map: IndexMap<String, String>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Insert or replace; a replaced key keeps its original position
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.map.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Overwrite with every key of `other`
    pub fn update(&mut self, other: &Attributes) {
        for (k, v) in other.iter() {
            self.insert(k, v);
        }
    }

    /// Copy only the keys of `other` that are not present yet
    pub fn merge_missing(&mut self, other: &Attributes) {
        for (k, v) in other.iter() {
            if !self.contains_key(k) {
                self.insert(k, v);
            }
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.get(ID_KEY)
    }

    /// `Parent` values, split on commas
    pub fn parents(&self) -> Vec<&str> {
        self.get(PARENT_KEY)
            .map(|p| p.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }

    pub fn gene_id(&self) -> Option<&str> {
        self.get(GENE_ID_KEY)
    }

    pub fn transcript_id(&self) -> Option<&str> {
        self.get(TRANSCRIPT_ID_KEY)
    }
}

/// Parse the attribute column of a GFF3 or GTF line
///
/// # Examples
/// ```
/// use genial::formats::attributes::{parse_attributes, AttributePolicy};
/// use genial::formats::gff::FileFormat;
///
/// let attrs = parse_attributes(
///     "gene_id \"G1\"; transcript_id \"T1\";",
///     FileFormat::Gtf,
///     AttributePolicy::FailFast,
/// ).unwrap();
/// assert_eq!(attrs.gene_id(), Some("G1"));
/// assert_eq!(attrs.transcript_id(), Some("T1"));
/// ```
pub fn parse_attributes(
    raw: &str,
    format: FileFormat,
    policy: AttributePolicy,
) -> Result<Attributes, AttributeParseError> {
    let protected = raw
        .replace("&#59;", "%3B")
        .replace("&#x3B;", "%3B")
        .replace("&#x3b;", "%3B");
    let unescaped = unescape_html(&protected);
    let text = unescaped.trim();

    let mut attributes = Attributes::new();
    if text.is_empty() || text == "." {
        return Ok(attributes);
    }

    let text = TRAILING_SEMICOLON.replace(text, "");
    let pattern: &Regex = match format {
        FileFormat::Gff3 => &*GFF3_TOKEN,
        FileFormat::Gtf => &*GTF_TOKEN,
    };

    for token in text.split(';') {
        if token.trim().is_empty() {
            continue;
        }

        let caps = match pattern.captures(token) {
            Some(caps) => caps,
            None => {
                let err = AttributeParseError {
                    format,
                    token: token.trim().to_string(),
                };
                match policy {
                    AttributePolicy::FailFast => return Err(err),
                    AttributePolicy::WarnAndSkip => {
                        warn!("skipping attribute: {}", err);
                        continue;
                    }
                }
            }
        };

        let key = &caps[1];
        let value = &caps[2];

        if format == FileFormat::Gff3 && (key == ID_KEY || key == PARENT_KEY) {
            let value = strip_id_prefixes(value, &mut attributes);
            attributes.insert(key, value);
        } else {
            attributes.insert(key, value);
        }
    }

    Ok(attributes)
}

/// True if at least one token of `raw` is a well-formed id key of
/// `format` (`ID`/`Parent` for GFF3, `gene_id`/`transcript_id` for both).
/// Nothing is logged.
pub fn has_id_token(raw: &str, format: FileFormat) -> bool {
    let pattern: &Regex = match format {
        FileFormat::Gff3 => &*GFF3_TOKEN,
        FileFormat::Gtf => &*GTF_TOKEN,
    };
    raw.split(';')
        .filter_map(|token| pattern.captures(token))
        .any(|caps| match &caps[1] {
            GENE_ID_KEY | TRANSCRIPT_ID_KEY => true,
            ID_KEY | PARENT_KEY => format == FileFormat::Gff3,
            _ => false,
        })
}

/// Strip `word:` prefixes from each comma-separated id. A `gene:` or
/// `transcript:` prefix also seeds `gene_id`/`transcript_id` if missing.
fn strip_id_prefixes(value: &str, attributes: &mut Attributes) -> String {
    value
        .split(',')
        .map(|id| match ID_PREFIX.captures(id) {
            Some(caps) => {
                let prefix = caps.get(1).map_or("", |m| m.as_str());
                let bare = caps.get(2).map_or("", |m| m.as_str()).to_string();
                if prefix == "gene" || prefix == "transcript" {
                    let derived = format!("{}_id", prefix);
                    if !attributes.contains_key(&derived) {
                        attributes.insert(derived, bare.clone());
                    }
                }
                bare
            }
            None => id.to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Decode HTML character references (`&amp;`, `&#38;`, `&#x26;` ...)
fn unescape_html(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let decoded = tail
            .find(';')
            .filter(|&end| end > 1 && end <= 10)
            .and_then(|end| decode_entity(&tail[1..end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}
