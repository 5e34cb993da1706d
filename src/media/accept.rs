//! `Accept` header parsing.

use super::media_type::MediaType;

/// One candidate of an `Accept` header.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptEntry {
    /// Media range, without the `q` weight and accept-extensions.
    pub media_type: MediaType,
    /// Explicit `q` weight, if the client sent one.
    pub weight: Option<f32>,
}

impl AcceptEntry {
    /// Effective weight (1.0 when absent).
    pub fn quality(&self) -> f32 {
        self.weight.unwrap_or(1.0)
    }

    /// True if the client marked this range as not acceptable (`q=0`).
    pub fn is_rejection(&self) -> bool {
        self.quality() <= 0.0
    }

    /// True if the range carries any parameter besides those listed,
    /// counting an explicit `q` weight.
    pub fn is_modified(&self, allowed: &[&str]) -> bool {
        self.weight.is_some() || self.media_type.has_params_other_than(allowed)
    }
}

/// A parsed `Accept` header.
#[derive(Debug, Clone, Default)]
pub struct AcceptHeader {
    entries: Vec<AcceptEntry>,
}

impl AcceptHeader {
    /// Parse an `Accept` header.
    ///
    /// Candidates that fail to parse, or carry an invalid weight, are
    /// dropped.
    ///
    /// ```
    /// use conneg::media::AcceptHeader;
    ///
    /// let accept = AcceptHeader::parse("text/html;q=0.5, text/csv, */*;q=0.1");
    /// let order: Vec<String> = accept.preferred().map(|e| e.media_type.essence()).collect();
    /// assert_eq!(order, ["text/csv", "text/html", "*/*"]);
    /// ```
    pub fn parse(header: &str) -> Self {
        let entries = header
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(parse_entry)
            .collect();

        Self { entries }
    }

    /// Candidates in header order.
    pub fn entries(&self) -> &[AcceptEntry] {
        &self.entries
    }

    /// True if no candidate survived parsing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Candidates by preference: weight, then specificity, then header order.
    pub fn preferred(&self) -> impl Iterator<Item = &AcceptEntry> {
        let mut ordered: Vec<&AcceptEntry> = self.entries.iter().collect();
        // sort_by is stable, so ties keep header order
        ordered.sort_by(|a, b| {
            b.quality()
                .total_cmp(&a.quality())
                .then_with(|| b.media_type.specificity().cmp(&a.media_type.specificity()))
        });
        ordered.into_iter()
    }

    /// Ranges the client explicitly refused with `q=0`.
    pub fn rejections(&self) -> impl Iterator<Item = &AcceptEntry> {
        self.entries.iter().filter(|e| e.is_rejection())
    }
}

fn parse_entry(raw: &str) -> Option<AcceptEntry> {
    let mut media_type = MediaType::parse(raw).ok()?;

    // Everything after `q` is an accept-extension, not a media type parameter.
    let mut weight = None;
    if let Some(pos) = media_type.params.iter().position(|(name, _)| name == "q") {
        let q = parse_weight(&media_type.params[pos].1)?;
        weight = Some(q);
        media_type.params.truncate(pos);
    }

    Some(AcceptEntry { media_type, weight })
}

fn parse_weight(value: &str) -> Option<f32> {
    let q: f32 = value.parse().ok()?;
    (0.0..=1.0).contains(&q).then_some(q)
}
