//! Collation for table-of-contents ordering.
//!
//! Without a configured locale, strings sort by Unicode code point so that output is the
//! same on every platform. A locale collator folds case and accents and places the
//! extra letters of the Nordic alphabets after `z`, in the order each language uses.

use std::cmp::Ordering;
use unicode_normalization::char::{decompose_canonical, is_combining_mark};

pub trait Collator: std::fmt::Debug + Send + Sync {
    fn sort_key(&self, s: &str) -> Vec<u32>;

    /// Total order: collation weights first, code points as tie breaker.
    fn compare(&self, a: &str, b: &str) -> Ordering {
        self.sort_key(a)
            .cmp(&self.sort_key(b))
            .then_with(|| a.cmp(b))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CodepointCollator;

impl Collator for CodepointCollator {
    fn sort_key(&self, s: &str) -> Vec<u32> {
        s.chars().map(|c| c as u32).collect()
    }
}

// primary weights are code point * STRIDE, tailored letters fill the gap after 'z'
const STRIDE: u32 = 4;

#[derive(Debug, Clone)]
pub struct LocaleCollator {
    locale: String,
    tailored: Vec<char>,
}

impl LocaleCollator {
    pub fn new(locale: &str) -> Self {
        let tailored = match language(locale).as_str() {
            "sv" | "fi" => vec!['å', 'ä', 'ö'],
            "da" | "nb" | "nn" | "no" => vec!['æ', 'ø', 'å'],
            _ => vec![],
        };
        LocaleCollator {
            locale: locale.to_string(),
            tailored,
        }
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }
}

impl Collator for LocaleCollator {
    fn sort_key(&self, s: &str) -> Vec<u32> {
        let mut key = Vec::with_capacity(s.len());
        for c in s.chars().flat_map(char::to_lowercase) {
            if let Some(pos) = self.tailored.iter().position(|t| *t == c) {
                key.push('z' as u32 * STRIDE + 1 + pos as u32);
                continue;
            }
            decompose_canonical(c, |d| {
                if !is_combining_mark(d) {
                    key.push(d as u32 * STRIDE);
                }
            });
        }
        key
    }
}

/// Language part of a locale identifier such as `sv_SE.UTF-8`.
fn language(locale: &str) -> String {
    locale
        .split(['_', '-', '.', '@'])
        .next()
        .unwrap_or("")
        .to_lowercase()
}

/// The collator for `locale`; code point order when no locale (or `C`/`POSIX`) is given.
pub fn collator_for(locale: Option<&str>) -> Box<dyn Collator> {
    match locale.map(str::trim) {
        None | Some("") | Some("C") | Some("POSIX") => Box::new(CodepointCollator),
        Some(locale) if locale.starts_with("C.") => Box::new(CodepointCollator),
        Some(locale) => Box::new(LocaleCollator::new(locale)),
    }
}

pub fn sort_strings(values: &mut [String], collator: &dyn Collator, descending: bool) {
    values.sort_by(|a, b| {
        let ord = collator.compare(a, b);
        if descending {
            ord.reverse()
        } else {
            ord
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(locale: Option<&str>, words: &[&str]) -> Vec<String> {
        let mut values: Vec<String> = words.iter().map(|s| s.to_string()).collect();
        sort_strings(&mut values, collator_for(locale).as_ref(), false);
        values
    }

    #[test]
    fn test_codepoint_default() {
        assert_eq!(sorted(None, &["b", "B", "a", "é"]), vec!["B", "a", "b", "é"]);
        assert_eq!(sorted(Some("C"), &["b", "A"]), vec!["A", "b"]);
    }

    #[test]
    fn test_swedish_order() {
        assert_eq!(
            sorted(Some("sv_SE.UTF-8"), &["ö", "å", "z", "ä", "a", "É", "e"]),
            vec!["a", "e", "É", "z", "å", "ä", "ö"]
        );
    }

    #[test]
    fn test_danish_order() {
        assert_eq!(
            sorted(Some("da_DK"), &["å", "ø", "æ", "z"]),
            vec!["z", "æ", "ø", "å"]
        );
    }

    #[test]
    fn test_descending() {
        let mut values = vec!["2009".to_string(), "2010".to_string()];
        sort_strings(&mut values, &CodepointCollator, true);
        assert_eq!(values, vec!["2010", "2009"]);
    }
}
