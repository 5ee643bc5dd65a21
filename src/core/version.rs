//! Package versions and version constraints.
//!
//! Versions are not semver: recipes declare things like `2.9.0b` or
//! `1.8.14`, so a version is a list of numeric and alphabetic segments.
//! A version *contains* every version it is a prefix of, which is what
//! lets `foo@1.2` match `1.2.7`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One segment of a version string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Segment {
    Num(u64),
    Alpha(String),
}

impl Ord for Segment {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Segment::Num(a), Segment::Num(b)) => a.cmp(b),
            (Segment::Alpha(a), Segment::Alpha(b)) => a.cmp(b),
            // Alphabetic segments sort below numeric ones: 1.0b < 1.0.1
            (Segment::Alpha(_), Segment::Num(_)) => Ordering::Less,
            (Segment::Num(_), Segment::Alpha(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Error returned when a version or version constraint cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid version `{text}`: {reason}")]
pub struct InvalidVersionError {
    pub text: String,
    pub reason: &'static str,
}

/// A single package version such as `2.9.0b`.
#[derive(Debug, Clone)]
pub struct Version {
    text: String,
    segments: Vec<Segment>,
}

impl Version {
    /// Parse a version string.
    pub fn parse(text: &str) -> Result<Self, InvalidVersionError> {
        let invalid = |reason| InvalidVersionError {
            text: text.to_string(),
            reason,
        };

        if text.is_empty() {
            return Err(invalid("empty version"));
        }
        if !text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        {
            return Err(invalid("versions may only contain letters, digits, `.`, `-` and `_`"));
        }

        let mut segments = Vec::new();
        let mut chars = text.chars().peekable();
        while let Some(&c) = chars.peek() {
            if c.is_ascii_digit() {
                let mut digits = String::new();
                while let Some(&d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                    digits.push(d);
                    chars.next();
                }
                let n = digits
                    .parse()
                    .map_err(|_| invalid("numeric segment out of range"))?;
                segments.push(Segment::Num(n));
            } else if c.is_ascii_alphabetic() {
                let mut word = String::new();
                while let Some(&a) = chars.peek().filter(|a| a.is_ascii_alphabetic()) {
                    word.push(a);
                    chars.next();
                }
                segments.push(Segment::Alpha(word));
            } else {
                chars.next();
            }
        }

        if segments.is_empty() {
            return Err(invalid("no version segments"));
        }

        Ok(Version {
            text: text.to_string(),
            segments,
        })
    }

    /// The version as written.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether this version is a segment-wise prefix of `other`.
    ///
    /// `1.2` contains `1.2`, `1.2.0` and `1.2.7`, but not `1.20`.
    pub fn contains(&self, other: &Version) -> bool {
        other.segments.len() >= self.segments.len()
            && self.segments[..] == other.segments[..self.segments.len()]
    }

    /// `self <= other`, treating every version `other` contains as equal to it.
    fn at_most(&self, upper: &Version) -> bool {
        self <= upper || upper.contains(self)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.segments == other.segments
    }
}

impl Eq for Version {}

impl std::hash::Hash for Version {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.segments.hash(state);
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.segments.cmp(&other.segments)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for Version {
    type Err = InvalidVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.text.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Version::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// One item of a version list: an exact version or an inclusive range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionItem {
    Exact(Version),
    Range {
        lo: Option<Version>,
        hi: Option<Version>,
    },
}

impl VersionItem {
    fn contains(&self, v: &Version) -> bool {
        match self {
            VersionItem::Exact(e) => e.contains(v),
            VersionItem::Range { lo, hi } => {
                lo.as_ref().map_or(true, |lo| lo <= v) && hi.as_ref().map_or(true, |hi| v.at_most(hi))
            }
        }
    }

    fn intersect(&self, other: &VersionItem) -> Option<VersionItem> {
        use VersionItem::*;

        match (self, other) {
            (Exact(a), Exact(b)) => {
                if a.contains(b) {
                    Some(Exact(b.clone()))
                } else if b.contains(a) {
                    Some(Exact(a.clone()))
                } else {
                    None
                }
            }
            (Exact(v), range @ Range { .. }) | (range @ Range { .. }, Exact(v)) => {
                range.contains(v).then(|| Exact(v.clone()))
            }
            (Range { lo: lo1, hi: hi1 }, Range { lo: lo2, hi: hi2 }) => {
                let lo = match (lo1, lo2) {
                    (Some(a), Some(b)) => Some(a.max(b).clone()),
                    (a, b) => a.clone().or_else(|| b.clone()),
                };
                let hi = match (hi1, hi2) {
                    (Some(a), Some(b)) => {
                        // The narrower bound wins; a bound that contains the
                        // other is the wider one.
                        if a.contains(b) {
                            Some(b.clone())
                        } else if b.contains(a) {
                            Some(a.clone())
                        } else {
                            Some(a.min(b).clone())
                        }
                    }
                    (a, b) => a.clone().or_else(|| b.clone()),
                };
                match (&lo, &hi) {
                    (Some(l), Some(h)) if !l.at_most(h) => None,
                    (Some(l), Some(h)) if l == h => Some(Exact(l.clone())),
                    _ => Some(Range { lo, hi }),
                }
            }
        }
    }
}

impl fmt::Display for VersionItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionItem::Exact(v) => write!(f, "{}", v),
            VersionItem::Range { lo, hi } => {
                if let Some(lo) = lo {
                    write!(f, "{}", lo)?;
                }
                f.write_str(":")?;
                if let Some(hi) = hi {
                    write!(f, "{}", hi)?;
                }
                Ok(())
            }
        }
    }
}

/// A version constraint: a comma separated list of versions and ranges.
///
/// An empty list places no constraint at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VersionConstraint {
    items: Vec<VersionItem>,
}

impl VersionConstraint {
    /// The unconstrained version list.
    pub fn any() -> Self {
        VersionConstraint::default()
    }

    /// A constraint holding exactly one version.
    pub fn exact(version: Version) -> Self {
        VersionConstraint {
            items: vec![VersionItem::Exact(version)],
        }
    }

    /// Build a constraint from items, dropping duplicates and sorting them.
    pub fn from_items(items: Vec<VersionItem>) -> Self {
        let mut constraint = VersionConstraint { items };
        constraint.canonicalize();
        constraint
    }

    /// Parse `1.2`, `1.2:1.4`, `:1.4`, `1.2:` or a comma separated list of those.
    pub fn parse(text: &str) -> Result<Self, InvalidVersionError> {
        let mut items = Vec::new();
        for part in text.split(',').map(str::trim) {
            if part.is_empty() {
                return Err(InvalidVersionError {
                    text: text.to_string(),
                    reason: "empty item in version list",
                });
            }
            let item = match part.split_once(':') {
                None => VersionItem::Exact(Version::parse(part)?),
                Some((lo, hi)) => {
                    let lo = (!lo.is_empty()).then(|| Version::parse(lo)).transpose()?;
                    let hi = (!hi.is_empty()).then(|| Version::parse(hi)).transpose()?;
                    VersionItem::Range { lo, hi }
                }
            };
            items.push(item);
        }
        Ok(VersionConstraint::from_items(items))
    }

    fn canonicalize(&mut self) {
        // An open range admits everything, so the whole list collapses to any.
        if self
            .items
            .iter()
            .any(|i| matches!(i, VersionItem::Range { lo: None, hi: None }))
        {
            self.items.clear();
            return;
        }
        let mut seen = Vec::with_capacity(self.items.len());
        for item in self.items.drain(..) {
            if !seen.contains(&item) {
                seen.push(item);
            }
        }
        seen.sort_by(|a, b| item_sort_key(a).cmp(&item_sort_key(b)));
        self.items = seen;
    }

    /// Whether this constraint places no restriction.
    pub fn is_any(&self) -> bool {
        self.items.is_empty()
    }

    /// The single exact version, if this constraint pins exactly one.
    pub fn concrete(&self) -> Option<&Version> {
        match self.items.as_slice() {
            [VersionItem::Exact(v)] => Some(v),
            _ => None,
        }
    }

    /// Whether `version` is admitted by this constraint.
    pub fn contains(&self, version: &Version) -> bool {
        self.is_any() || self.items.iter().any(|i| i.contains(version))
    }

    /// Whether this constraint is compatible with `other`.
    ///
    /// A concrete version must be admitted by `other`; otherwise the two
    /// lists only have to overlap.
    pub fn satisfies(&self, other: &VersionConstraint) -> bool {
        match self.concrete() {
            Some(v) => other.contains(v),
            None => self.intersect(other).is_some(),
        }
    }

    /// Intersection of two constraints, `None` when nothing satisfies both.
    pub fn intersect(&self, other: &VersionConstraint) -> Option<VersionConstraint> {
        if self.is_any() {
            return Some(other.clone());
        }
        if other.is_any() {
            return Some(self.clone());
        }

        let items: Vec<_> = self
            .items
            .iter()
            .flat_map(|a| other.items.iter().filter_map(move |b| a.intersect(b)))
            .collect();

        (!items.is_empty()).then(|| VersionConstraint::from_items(items))
    }

    /// The highest of `versions` admitted by this constraint.
    pub fn highest_in<'a>(&self, versions: impl IntoIterator<Item = &'a Version>) -> Option<&'a Version> {
        versions.into_iter().filter(|v| self.contains(v)).max()
    }

    /// Iterate over the items of the list.
    pub fn items(&self) -> &[VersionItem] {
        &self.items
    }
}

fn item_sort_key(item: &VersionItem) -> (Option<&Version>, Option<&Version>) {
    match item {
        VersionItem::Exact(v) => (Some(v), Some(v)),
        VersionItem::Range { lo, hi } => (lo.as_ref(), hi.as_ref()),
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_any() {
            return f.write_str(":");
        }
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", item)?;
        }
        Ok(())
    }
}

impl FromStr for VersionConstraint {
    type Err = InvalidVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionConstraint::parse(s)
    }
}

impl Serialize for VersionConstraint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_string().serialize(serializer)
    }
}
