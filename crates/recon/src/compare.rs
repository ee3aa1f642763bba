//! Part-number and software-version ordering rules.
//!
//! Both comparators are total: every input pair resolves to a [`Status`].

use std::cmp::Ordering;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::{ShortPartPolicy, UnparseablePolicy};
use crate::model::{is_missing, Status};

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+\.\d+\.\d+").expect("valid version pattern"))
}

fn from_ordering(ord: Ordering) -> Status {
    match ord {
        Ordering::Equal => Status::Match,
        Ordering::Greater => Status::Newer,
        Ordering::Less => Status::Older,
    }
}

// ---------------------------------------------------------------------------
// Part numbers
// ---------------------------------------------------------------------------

/// Revision suffix of a part number: its last two characters, upper-cased.
/// Shorter inputs have no suffix and return `None`.
pub fn revision_suffix(part_number: &str) -> Option<String> {
    let chars: Vec<char> = part_number.trim().chars().collect();
    if chars.len() < 2 {
        return None;
    }
    Some(chars[chars.len() - 2..].iter().collect::<String>().to_uppercase())
}

/// Compare part numbers by revision suffix only. The base number is tied to
/// ECU identity and is not checked here.
pub fn compare_parts(reported: Option<&str>, expected: Option<&str>, policy: ShortPartPolicy) -> Status {
    if is_missing(reported) || is_missing(expected) {
        return Status::NotFound;
    }
    let reported = revision_suffix(reported.unwrap_or_default());
    let expected = revision_suffix(expected.unwrap_or_default());

    match (reported, expected, policy) {
        (Some(r), Some(e), _) => from_ordering(r.cmp(&e)),
        (_, _, ShortPartPolicy::NotFound) => Status::NotFound,
        // An absent suffix sorts as the empty string.
        (r, e, ShortPartPolicy::Match) => from_ordering(r.unwrap_or_default().cmp(&e.unwrap_or_default())),
    }
}

// ---------------------------------------------------------------------------
// Software versions
// ---------------------------------------------------------------------------

/// Dotted numeric version. Missing trailing components count as zero, so
/// `1.2` equals `1.2.0`. Components are kept as digit strings without leading
/// zeros, so any length compares correctly.
#[derive(Debug, Clone)]
pub struct SwVersion {
    components: Vec<String>,
}

impl SwVersion {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let raw = raw.strip_prefix(['v', 'V']).unwrap_or(raw);
        if raw.is_empty() {
            return None;
        }
        let components = raw
            .split('.')
            .map(|c| {
                if c.is_empty() || !c.bytes().all(|b| b.is_ascii_digit()) {
                    None
                } else {
                    Some(c.trim_start_matches('0').to_string())
                }
            })
            .collect::<Option<Vec<_>>>()?;
        Some(Self { components })
    }

    /// Components with leading zeros removed; zero is the empty string.
    pub fn components(&self) -> &[String] {
        &self.components
    }
}

fn cmp_component(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

impl Ord for SwVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        (0..len)
            .map(|i| {
                let a = self.components.get(i).map(String::as_str).unwrap_or("");
                let b = other.components.get(i).map(String::as_str).unwrap_or("");
                cmp_component(a, b)
            })
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for SwVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SwVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SwVersion {}

/// The comparable part of a version cell: the first `N.N.N` run, or the
/// whole trimmed cell when there is none.
pub fn version_core(raw: &str) -> &str {
    version_pattern()
        .find(raw)
        .map(|m| m.as_str())
        .unwrap_or_else(|| raw.trim())
}

/// Compare software versions numerically, component by component.
pub fn compare_versions(reported: Option<&str>, expected: Option<&str>, policy: UnparseablePolicy) -> Status {
    let (Some(reported), Some(expected)) = (reported, expected) else {
        return Status::NotFound;
    };
    if is_missing(Some(reported)) || is_missing(Some(expected)) {
        return Status::NotFound;
    }

    match (
        SwVersion::parse(version_core(reported)),
        SwVersion::parse(version_core(expected)),
    ) {
        (Some(r), Some(e)) => from_ordering(r.cmp(&e)),
        _ => {
            tracing::debug!(reported, expected, "unparseable software version");
            match policy {
                UnparseablePolicy::Older => Status::Older,
                UnparseablePolicy::NotFound => Status::NotFound,
            }
        }
    }
}
