//! Deterministic, URL-safe product slugs.
//!
//! Pipeline: lowercase and drop a duplicated brand prefix, strip noise tokens
//! through [`NOISE_RULES`], collapse to `[a-z0-9-]`, prefix the brand slug,
//! truncate at a word boundary, append the capacity token if missing, and
//! finish with a suffix taken from the end of the external id.
//!
//! The same inputs always produce the same slug, so re-slugging only changes
//! output when title, brand, or capacity changed.

use std::sync::LazyLock;

use pricecat_core::CapacityUnit;
use regex::Regex;

/// Maximum length of the slug base before capacity and id suffixes.
const MAX_BASE_LEN: usize = 60;

/// How far back from `MAX_BASE_LEN` a `-` may sit and still be used as the
/// cut point. Past this window the base is cut mid-word.
const BOUNDARY_WINDOW: usize = 20;

/// Trailing external-id characters appended to every slug.
const ID_SUFFIX_LEN: usize = 4;

const FALLBACK_BASE: &str = "product";

/// Ordered `(pattern, replacement)` rules applied to the lowercased title.
/// Order matters: capacity spacing is normalized before jargon is stripped.
const NOISE_RULES: &[(&str, &str)] = &[
    // bracketed asides
    (r"\([^)]*\)|\[[^\]]*\]", " "),
    // capacity spelling: "1,5 to" -> "1.5tb", "128 go" -> "128gb", "2 tb" -> "2tb"
    (r"(\d),(\d)", "${1}.${2}"),
    (r"(\d+(?:\.\d+)?)\s*to\b", "${1}tb"),
    (r"(\d+(?:\.\d+)?)\s*go\b", "${1}gb"),
    (r"(\d+(?:\.\d+)?)\s+(tb|gb)\b", "${1}${2}"),
    // protocol / interface jargon
    (r"\bpci[\s-]?e(?:xpress)?(?:\s*(?:gen\s*)?\d(?:\.\d)?)?(?:\s*x\d)?\b", " "),
    (r"\bgen\s?\d(?:\s?x\d)?\b", " "),
    (r"\bnvme\b", " "),
    (r"\bm\.2(?:\s*2280)?\b", " "),
    (r"\b2280\b", " "),
    (r"\bsata(?:\s*(?:iii|3|6\s?gb/s))?\b", " "),
    (r"\busb[\s-]?(?:c|3\.\d|3|2\.0)?(?:\s*gen\s*\d(?:x\d)?)?\b", " "),
    (r"\bthunderbolt(?:\s*\d)?\b", " "),
    (r"\b\d+\s?mb/s\b", " "),
    (r"\bup to\b", " "),
    // generic category words
    (r"\b(?:internal|external|portable)\b", " "),
    (
        r"\b(?:solid[\s-]state(?:[\s-]drive)?|ssd|hdd|hard[\s-]d(?:rive|isk)|disque dur|festplatte)\b",
        " ",
    ),
    (
        r"\b(?:micro\s?sd(?:xc|hc)?|sdxc|sdhc|memory card|flash drive|speicherkarte)\b",
        " ",
    ),
    // certification words
    (r"\b(?:uhs-?i{1,3}|u[13]|v[369]0|a[12]|class\s?10|c10)\b", " "),
    (r"\b(?:certified|renewed|refurbished)\b", " "),
    // marketing filler
    (r"\b(?:compatible with ps5|for ps5|ps5|playstation 5)\b", " "),
    (
        r"\b(?:with heatsink|heatsink|high[\s-]performance|gaming|latest|new|version|edition|ultra[\s-]fast)\b",
        " ",
    ),
];

static COMPILED_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    NOISE_RULES
        .iter()
        .map(|(pattern, replacement)| {
            (
                Regex::new(pattern).expect("valid slug noise regex"),
                *replacement,
            )
        })
        .collect()
});

/// Fields a slug is derived from.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlugInput<'a> {
    pub title: &'a str,
    pub brand: Option<&'a str>,
    pub external_id: Option<&'a str>,
    pub capacity: Option<f64>,
    pub unit: Option<CapacityUnit>,
}

/// Builds the slug with the standard short external-id suffix.
///
/// Never fails; degenerate input still yields a usable slug.
#[must_use]
pub fn generate_slug(input: &SlugInput<'_>) -> String {
    build_slug(input, Some(ID_SUFFIX_LEN))
}

/// Builds the slug with the entire external id as suffix. Used when the
/// short form collides with another product's slug.
#[must_use]
pub fn generate_slug_with_full_id(input: &SlugInput<'_>) -> String {
    build_slug(input, None)
}

fn build_slug(input: &SlugInput<'_>, id_suffix_len: Option<usize>) -> String {
    let brand_slug = input.brand.map(collapse).unwrap_or_default();

    let lower = input.title.to_lowercase();
    let without_brand = match input.brand {
        Some(brand) => strip_brand_prefix(&lower, &brand.to_lowercase()),
        None => lower.as_str(),
    };

    let cleaned = strip_noise(without_brand);
    let mut base = collapse(&cleaned);

    if !brand_slug.is_empty() && !has_segment_prefix(&base, &brand_slug) {
        base = if base.is_empty() {
            brand_slug
        } else {
            format!("{brand_slug}-{base}")
        };
    }

    let mut slug = truncate_at_boundary(&base, MAX_BASE_LEN).to_string();
    if slug.is_empty() {
        slug = FALLBACK_BASE.to_string();
    }

    if let Some(token) = capacity_token(input.capacity, input.unit) {
        if !contains_segment(&slug, &token) {
            slug.push('-');
            slug.push_str(&token);
        }
    }

    if let Some(suffix) = input
        .external_id
        .map(|id| id_suffix(id, id_suffix_len))
        .filter(|s| !s.is_empty())
    {
        slug.push('-');
        slug.push_str(&suffix);
    }

    slug
}

/// Removes one or more leading copies of `brand` (already lowercased).
fn strip_brand_prefix<'a>(lower: &'a str, brand: &str) -> &'a str {
    let brand = brand.trim();
    if brand.is_empty() {
        return lower;
    }
    let mut rest = lower.trim_start();
    while let Some(after) = rest.strip_prefix(brand) {
        if after.chars().next().is_some_and(char::is_alphanumeric) {
            break;
        }
        rest = after.trim_start_matches(|c: char| !c.is_alphanumeric());
    }
    rest
}

fn strip_noise(text: &str) -> String {
    COMPILED_RULES
        .iter()
        .fold(text.to_string(), |acc, (re, replacement)| {
            re.replace_all(&acc, *replacement).into_owned()
        })
}

/// Maps to `[a-z0-9-]`: ASCII alphanumerics kept (lowercased), apostrophes
/// and non-ASCII letters dropped, everything else becomes a single `-`.
fn collapse(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else if !is_dropped(c) {
            pending_dash = true;
        }
    }
    out
}

fn is_dropped(c: char) -> bool {
    c == '\'' || c == '\u{2019}' || (c.is_alphanumeric() && !c.is_ascii())
}

fn has_segment_prefix(slug: &str, prefix: &str) -> bool {
    slug == prefix
        || slug
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('-'))
}

fn contains_segment(slug: &str, token: &str) -> bool {
    format!("-{slug}-").contains(&format!("-{token}-"))
}

/// Cuts `base` to at most `max` bytes, preferring the last `-` within
/// [`BOUNDARY_WINDOW`] of the limit. `base` is ASCII by construction.
fn truncate_at_boundary(base: &str, max: usize) -> &str {
    if base.len() <= max {
        return base;
    }
    let cut = &base[..max];
    let boundary = cut
        .rfind('-')
        .filter(|&pos| pos > 0 && pos >= max.saturating_sub(BOUNDARY_WINDOW));
    match boundary {
        Some(pos) => &cut[..pos],
        None => cut.trim_end_matches('-'),
    }
}

fn capacity_token(capacity: Option<f64>, unit: Option<CapacityUnit>) -> Option<String> {
    let (value, unit) = (capacity?, unit?);
    if !value.is_finite() || value <= 0.0 {
        return None;
    }
    Some(collapse(&format!("{value}{}", unit.as_str())))
}

fn id_suffix(external_id: &str, len: Option<usize>) -> String {
    let clean: Vec<char> = external_id
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    let start = len.map_or(0, |n| clean.len().saturating_sub(n));
    clean[start..].iter().collect()
}

#[cfg(test)]
#[path = "slug_test.rs"]
mod tests;
