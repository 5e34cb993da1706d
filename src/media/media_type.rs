//! Media type parsing and matching.

use std::fmt;
use std::str::FromStr;

use crate::error::{ConnegError, Result};

/// A parsed media type such as `text/csv; charset=utf-8`.
///
/// Type, subtype and parameter names are stored lower-cased so comparisons
/// are case-insensitive. Parameter values keep their case but lose any
/// surrounding quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    /// Top-level type (`text`, `application`, `*`).
    pub type_: String,
    /// Subtype (`csv`, `vnd.api+json`, `*`).
    pub subtype: String,
    /// Parameters in header order.
    pub params: Vec<(String, String)>,
}

impl MediaType {
    /// Create a media type without parameters.
    pub fn new(type_: &str, subtype: &str) -> Self {
        Self {
            type_: type_.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            params: Vec::new(),
        }
    }

    /// Parse a media type, parameters included.
    ///
    /// ```
    /// use conneg::media::MediaType;
    ///
    /// let mt = MediaType::parse("Multipart/Form-Data; boundary=\"X1\"").unwrap();
    /// assert_eq!(mt.essence(), "multipart/form-data");
    /// assert_eq!(mt.param("boundary"), Some("X1"));
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let mut segments = input.split(';');
        let essence = segments.next().unwrap_or_default().trim();

        let (type_, subtype) = essence
            .split_once('/')
            .ok_or_else(|| ConnegError::InvalidMediaType(format!("missing '/' in {input:?}")))?;
        let (type_, subtype) = (type_.trim(), subtype.trim());

        if !is_token(type_) || !is_token(subtype) {
            return Err(ConnegError::InvalidMediaType(input.to_string()));
        }
        if type_ == "*" && subtype != "*" {
            return Err(ConnegError::InvalidMediaType(format!(
                "wildcard type with concrete subtype in {input:?}"
            )));
        }

        let mut params = Vec::new();
        for segment in segments {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (name, value) = segment.split_once('=').ok_or_else(|| {
                ConnegError::InvalidMediaType(format!("malformed parameter {segment:?}"))
            })?;
            let name = name.trim();
            if !is_token(name) {
                return Err(ConnegError::InvalidMediaType(format!(
                    "malformed parameter {segment:?}"
                )));
            }
            params.push((name.to_ascii_lowercase(), unquote(value.trim()).to_string()));
        }

        Ok(Self {
            type_: type_.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            params,
        })
    }

    /// `type/subtype` without parameters.
    pub fn essence(&self) -> String {
        format!("{}/{}", self.type_, self.subtype)
    }

    /// Copy of this media type with parameters stripped.
    pub fn without_params(&self) -> Self {
        Self::new(&self.type_, &self.subtype)
    }

    /// Look up a parameter value by (case-insensitive) name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The `charset` parameter, if present.
    pub fn charset(&self) -> Option<&str> {
        self.param("charset")
    }

    /// True if any parameter other than those listed is present.
    pub fn has_params_other_than(&self, allowed: &[&str]) -> bool {
        self.params
            .iter()
            .any(|(name, _)| !allowed.iter().any(|a| a.eq_ignore_ascii_case(name)))
    }

    /// True for `*/*` and `type/*`.
    pub fn is_wildcard(&self) -> bool {
        self.type_ == "*" || self.subtype == "*"
    }

    /// How specific the pattern is: 0 for `*/*`, 1 for `type/*`, 2 otherwise.
    pub fn specificity(&self) -> u8 {
        match (self.type_.as_str(), self.subtype.as_str()) {
            ("*", _) => 0,
            (_, "*") => 1,
            _ => 2,
        }
    }

    /// True if `self`, read as a pattern, covers `other`.
    ///
    /// Only type and subtype take part; parameters never affect matching.
    pub fn matches(&self, other: &MediaType) -> bool {
        let type_ok = self.type_ == "*" || self.type_ == other.type_;
        let subtype_ok = self.subtype == "*" || self.subtype == other.subtype;
        type_ok && subtype_ok
    }

    /// True if both media types share the same essence.
    pub fn same_essence(&self, other: &MediaType) -> bool {
        self.type_ == other.type_ && self.subtype == other.subtype
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_, self.subtype)?;
        for (name, value) in &self.params {
            write!(f, "; {name}={value}")?;
        }
        Ok(())
    }
}

impl FromStr for MediaType {
    type Err = ConnegError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// RFC 7230 token characters.
fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}
