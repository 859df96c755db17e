//! BIN-based route table: card prefix → region.
//!
//! Entries are either a plain prefix (`"4"`, `"411111"`) or an inclusive
//! numeric range (`"400000-499999"`). Lookup order is deterministic:
//! prefixes from longest to shortest (lexicographic among equals), then
//! ranges by ascending lower bound; the first match wins. PANs shorter than
//! six digits route to the default region.

use std::collections::BTreeMap;

/// A route table entry that failed validation at load time.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("route key is empty")]
    EmptyKey,
    #[error("route prefix {key:?} is not numeric or longer than six digits")]
    BadPrefix { key: String },
    #[error("route range {key:?} is malformed (expected lo-hi with equal numeric widths of at most six digits)")]
    BadRange { key: String },
    #[error("route range {key:?} has lower bound above upper bound")]
    InvertedRange { key: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RangeEntry {
    lo: u64,
    hi: u64,
    width: usize,
    region: String,
}

/// Compiled, ordered route table. Read-only after load.
#[derive(Debug, Clone)]
pub struct RouteTable {
    /// Sorted longest first, lexicographic among equals.
    prefixes: Vec<(String, String)>,
    /// Sorted by ascending lower bound.
    ranges: Vec<RangeEntry>,
    default_region: String,
}

impl RouteTable {
    /// Compiles the configured `bin_routes` map into an ordered table.
    ///
    /// # Errors
    ///
    /// Returns the first `RouteError` encountered: empty keys, non-numeric
    /// prefixes, prefixes or ranges wider than the six-digit BIN, ranges
    /// whose bounds differ in width, and inverted ranges are all rejected.
    pub fn build(
        bin_routes: &BTreeMap<String, String>,
        default_region: &str,
    ) -> Result<Self, RouteError> {
        let mut prefixes = Vec::new();
        let mut ranges = Vec::new();

        for (key, region) in bin_routes {
            if key.is_empty() {
                return Err(RouteError::EmptyKey);
            }

            match key.split_once('-') {
                None => {
                    if key.len() > 6 || !key.bytes().all(|b| b.is_ascii_digit()) {
                        return Err(RouteError::BadPrefix { key: key.clone() });
                    }
                    prefixes.push((key.clone(), region.clone()));
                }
                Some((lo, hi)) => {
                    let numeric = |s: &str| {
                        !s.is_empty() && s.len() <= 6 && s.bytes().all(|b| b.is_ascii_digit())
                    };
                    if !numeric(lo) || !numeric(hi) || lo.len() != hi.len() {
                        return Err(RouteError::BadRange { key: key.clone() });
                    }
                    let (lo_n, hi_n) = (
                        lo.parse::<u64>().map_err(|_| RouteError::BadRange {
                            key: key.clone(),
                        })?,
                        hi.parse::<u64>().map_err(|_| RouteError::BadRange {
                            key: key.clone(),
                        })?,
                    );
                    if lo_n > hi_n {
                        return Err(RouteError::InvertedRange { key: key.clone() });
                    }
                    ranges.push(RangeEntry {
                        lo: lo_n,
                        hi: hi_n,
                        width: lo.len(),
                        region: region.clone(),
                    });
                }
            }
        }

        prefixes.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        ranges.sort_by_key(|r| r.lo);

        Ok(Self {
            prefixes,
            ranges,
            default_region: default_region.to_string(),
        })
    }

    /// Resolves the primary region for a PAN.
    #[must_use]
    pub fn route(&self, pan: &str) -> &str {
        let Some(bin) = pan.get(..6) else {
            return &self.default_region;
        };

        for (prefix, region) in &self.prefixes {
            if bin.starts_with(prefix.as_str()) {
                return region;
            }
        }

        for range in &self.ranges {
            let Some(head) = bin.get(..range.width) else {
                continue;
            };
            let Ok(value) = head.parse::<u64>() else {
                // Non-numeric BIN heads never match a numeric range.
                continue;
            };
            if (range.lo..=range.hi).contains(&value) {
                return &range.region;
            }
        }

        &self.default_region
    }

    /// The configured default region.
    #[must_use]
    pub fn default_region(&self) -> &str {
        &self.default_region
    }
}
