use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;

pub const UNKNOWN_NAME: &str = "Unknown_Name";
pub const UNKNOWN_MOBILE: &str = "Unknown_Mobile";

// Title group is optional: "DR. ", "CH." or any leading word.
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Name:\s*(\w+\.?\s*)?([A-Za-z\s]+)").unwrap());
// Only a word followed by a period counts as a title.
static PREFIX_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Name:\s*(?:(\w+)\.\s*)?([A-Za-z\s]+)").unwrap());
static MOBILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Mobile#:\s*([0-9]{10})(?:[^0-9]|$)").unwrap());

/// Name and phone read off one page. Both fields are always non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedIdentity {
    pub display_name: String,
    pub phone: String,
}

/// How a captured title token is folded into the display name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TitleRule {
    /// Replace the captured title text inside the joined name with
    /// `UPPER(title without period) + "_"`, wherever it occurs.
    #[default]
    Literal,
    /// `UPPER(title) + "_" + name`, where a title must end with a period.
    Prefix,
}

#[allow(dead_code)]
pub fn extract(page_text: &str) -> ExtractedIdentity {
    extract_with(page_text, TitleRule::Literal)
}

pub fn extract_with(page_text: &str, rule: TitleRule) -> ExtractedIdentity {
    let display_name = match rule {
        TitleRule::Literal => NAME_RE.captures(page_text).map(|c| literal_name(&c)),
        TitleRule::Prefix => PREFIX_NAME_RE.captures(page_text).map(|c| prefix_name(&c)),
    }
    .filter(|n| !n.is_empty())
    .unwrap_or_else(|| UNKNOWN_NAME.to_string());

    let phone = MOBILE_RE
        .captures(page_text)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_else(|| UNKNOWN_MOBILE.to_string());

    ExtractedIdentity {
        display_name,
        phone,
    }
}

fn literal_name(caps: &Captures) -> String {
    let title = caps.get(1).map_or("", |m| m.as_str());
    let joined = format!("{}{}", title, &caps[2]);
    let raw = joined.trim();
    if title.is_empty() {
        return raw.to_string();
    }

    // Target keeps the captured case; the replacement is uppercased.
    let target = title.trim();
    let replacement = format!("{}_", target.trim_end_matches('.').to_uppercase());
    raw.replace(target, &replacement)
}

fn prefix_name(caps: &Captures) -> String {
    let name = caps[2].trim();
    if name.is_empty() {
        return String::new();
    }
    match caps.get(1) {
        Some(title) => format!("{}_{}", title.as_str().to_uppercase(), name),
        None => name.to_string(),
    }
}

// ── Tests ──
