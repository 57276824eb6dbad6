//! IDE build identifiers and compatibility ranges
//!
//! A build identifier looks like `RM-252.23892.415`: an optional product code
//! followed by up to three dot-separated components. A `*` component is an
//! open-ended bound and sorts after every number.

use crate::errors::BuildParseError;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Number of components compared in a build identifier
pub const BUILD_COMPONENTS: usize = 3;

/// One component of a build triple.
///
/// Variant order matters: the derived `Ord` places `Wildcard` above every `Number`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BuildComponent {
    Number(u64),
    Wildcard,
}

impl fmt::Display for BuildComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildComponent::Number(n) => write!(f, "{}", n),
            BuildComponent::Wildcard => f.write_str("*"),
        }
    }
}

/// A parsed IDE build such as `RM-252.23892.415`.
///
/// Equality and ordering only look at the component triple; the product code
/// is carried for display.
#[derive(Debug, Clone)]
pub struct BuildIdentifier {
    product_code: Option<String>,
    components: [BuildComponent; BUILD_COMPONENTS],
}

impl BuildIdentifier {
    pub fn new(product_code: Option<&str>, components: [BuildComponent; BUILD_COMPONENTS]) -> Self {
        Self {
            product_code: product_code.map(str::to_string),
            components,
        }
    }

    /// `(0, 0, 0)`, the lower bound used when a range omits `since`
    pub fn zero() -> Self {
        Self::new(None, [BuildComponent::Number(0); BUILD_COMPONENTS])
    }

    /// `(*, *, *)`, the upper bound used when a range omits `until`
    pub fn unbounded() -> Self {
        Self::new(None, [BuildComponent::Wildcard; BUILD_COMPONENTS])
    }

    /// Parse a build string.
    ///
    /// Returns `None` for absent input: blank strings or a bare product code
    /// prefix. Components beyond the third are ignored. Missing components are
    /// zero-padded, except after a `*`: everything past an open-ended
    /// component is open-ended too. A non-`*` component contributes its
    /// leading digits, or zero when it has none.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }

        let (product_code, core) = split_product_code(trimmed);
        if core.is_empty() {
            return None;
        }

        let mut components = [BuildComponent::Number(0); BUILD_COMPONENTS];
        for (slot, part) in components.iter_mut().zip(core.split('.')) {
            *slot = parse_component(part);
        }
        if let Some(open) = components.iter().position(|c| *c == BuildComponent::Wildcard) {
            components[open..].fill(BuildComponent::Wildcard);
        }

        Some(Self {
            product_code: product_code.map(str::to_string),
            components,
        })
    }

    pub fn product_code(&self) -> Option<&str> {
        self.product_code.as_deref()
    }

    pub fn components(&self) -> &[BuildComponent; BUILD_COMPONENTS] {
        &self.components
    }
}

/// Strip a leading `XX-` product code (two or more uppercase ASCII letters).
fn split_product_code(input: &str) -> (Option<&str>, &str) {
    if let Some((code, rest)) = input.split_once('-') {
        if code.len() >= 2 && code.bytes().all(|b| b.is_ascii_uppercase()) {
            return (Some(code), rest);
        }
    }
    (None, input)
}

fn parse_component(part: &str) -> BuildComponent {
    let part = part.trim();
    if part == "*" {
        return BuildComponent::Wildcard;
    }

    let digits_end = part
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(part.len(), |(idx, _)| idx);
    let digits = &part[..digits_end];

    if digits.is_empty() {
        BuildComponent::Number(0)
    } else {
        BuildComponent::Number(digits.parse().unwrap_or(u64::MAX))
    }
}

impl PartialEq for BuildIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components
    }
}

impl Eq for BuildIdentifier {}

impl PartialOrd for BuildIdentifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BuildIdentifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components.cmp(&other.components)
    }
}

impl fmt::Display for BuildIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = &self.product_code {
            write!(f, "{}-", code)?;
        }
        let [a, b, c] = &self.components;
        write!(f, "{}.{}.{}", a, b, c)
    }
}

impl FromStr for BuildIdentifier {
    type Err = BuildParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| BuildParseError::Unparseable(s.to_string()))
    }
}

impl Serialize for BuildIdentifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Inclusive `[since, until]` interval a plugin declares itself usable in.
///
/// Bounds keep the raw strings from the manifest so they can be shown as written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompatibilityRange {
    pub since: Option<String>,
    pub until: Option<String>,
}

impl CompatibilityRange {
    pub fn new(since: Option<String>, until: Option<String>) -> Self {
        Self { since, until }
    }

    /// Parsed `since`, defaulting to `(0, 0, 0)` when absent, empty or unparseable
    pub fn lower_bound(&self) -> BuildIdentifier {
        self.since
            .as_deref()
            .and_then(BuildIdentifier::parse)
            .unwrap_or_else(BuildIdentifier::zero)
    }

    /// Parsed `until`, defaulting to `(*, *, *)` when absent, empty or unparseable
    pub fn upper_bound(&self) -> BuildIdentifier {
        self.until
            .as_deref()
            .and_then(BuildIdentifier::parse)
            .unwrap_or_else(BuildIdentifier::unbounded)
    }

    pub fn contains(&self, build: &BuildIdentifier) -> bool {
        self.lower_bound() <= *build && *build <= self.upper_bound()
    }
}

/// String-level compatibility check.
///
/// An unparseable `build` is never in range.
pub fn in_range(build: &str, since: Option<&str>, until: Option<&str>) -> bool {
    let Some(build) = BuildIdentifier::parse(build) else {
        return false;
    };
    CompatibilityRange::new(since.map(str::to_string), until.map(str::to_string)).contains(&build)
}
