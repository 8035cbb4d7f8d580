// WHY: Heuristic date extraction over free-form diary text
// Two decoupled stages: lexical match (automaton + explicit boundary check)
// followed by calendar construction per the pattern's layout.

use std::ops::Range;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use regex_automata::{meta::Regex, Input};
use tracing::debug;

pub mod patterns;

pub use patterns::{DatePattern, Layout, DATE_PATTERNS};

/// A recognized date together with where and how it was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateMatch<'a> {
    pub date: NaiveDate,
    /// Matched substring, borrowed from the input text
    pub matched: &'a str,
    /// Byte range of `matched` in the input text
    pub span: Range<usize>,
    pub pattern: &'static DatePattern,
}

#[derive(Debug, Clone)]
struct CompiledPattern {
    pattern: &'static DatePattern,
    regex: Regex,
}

/// Extracts calendar dates from text using the fixed pattern table
///
/// Compiled once, then shared freely: extraction takes `&self`, performs no
/// I/O and keeps no state between calls.
#[derive(Debug, Clone)]
pub struct DateExtractor {
    matchers: Vec<CompiledPattern>,
}

impl DateExtractor {
    /// Compile the pattern table
    pub fn new() -> Result<Self> {
        debug!("Compiling {} date patterns", DATE_PATTERNS.len());

        let matchers = DATE_PATTERNS
            .iter()
            .map(|pattern| {
                let regex = Regex::new(pattern.regex)
                    .with_context(|| format!("Failed to compile date pattern {}", pattern.name))?;
                Ok(CompiledPattern { pattern, regex })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { matchers })
    }

    /// Extract every date in `text`
    ///
    /// Results are grouped by pattern, not by position: all matches of the
    /// first table entry (in text order), then all matches of the second,
    /// and so on. Callers wanting "the earliest date in the document" must
    /// not assume the first element is it.
    pub fn extract(&self, text: &str) -> Vec<NaiveDate> {
        self.extract_matches(text)
            .into_iter()
            .map(|found| found.date)
            .collect()
    }

    /// First date in result order, the one filing and indexing use
    pub fn first_date(&self, text: &str) -> Option<NaiveDate> {
        self.extract_matches(text).first().map(|found| found.date)
    }

    /// Extract every date in `text` with its provenance, in the same order
    /// as [`DateExtractor::extract`]
    pub fn extract_matches<'a>(&self, text: &'a str) -> Vec<DateMatch<'a>> {
        let mut found = Vec::new();

        for compiled in &self.matchers {
            scan_pattern(compiled, text, &mut found);
        }

        debug!("Extracted {} dates from {} bytes", found.len(), text.len());
        found
    }
}

/// Collect all non-overlapping matches of one pattern, left to right
fn scan_pattern<'a>(compiled: &CompiledPattern, text: &'a str, found: &mut Vec<DateMatch<'a>>) {
    let mut search_pos = 0;

    while search_pos < text.len() {
        let input = Input::new(text).range(search_pos..);
        let Some(candidate) = compiled.regex.find(input) else {
            break;
        };
        let span = candidate.range();

        // WHY: a rejected candidate consumes nothing; a later start may still match
        if compiled.pattern.word_bounded && !is_word_bounded(text, &span) {
            search_pos = next_char_start(text, span.start);
            continue;
        }

        let matched = &text[span.clone()];
        match compiled.pattern.layout.to_date(matched) {
            Some(date) => found.push(DateMatch {
                date,
                matched,
                span: span.clone(),
                pattern: compiled.pattern,
            }),
            None => debug!(
                pattern = compiled.pattern.name,
                matched, "Discarding match that is not a calendar date"
            ),
        }

        search_pos = span.end;
    }
}

/// Word characters are Unicode alphanumerics and `_`
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// True when neither neighbour of `span` is a word character
///
/// Every pattern starts and ends with a digit, so this is exactly a word
/// boundary on both sides of the match.
fn is_word_bounded(text: &str, span: &Range<usize>) -> bool {
    let before = text[..span.start].chars().next_back();
    let after = text[span.end..].chars().next();
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

fn next_char_start(text: &str, pos: usize) -> usize {
    pos + text[pos..].chars().next().map_or(1, char::len_utf8)
}

/// Text the collaborators feed to the extractor for one document
pub fn document_text(title: &str, body: &str) -> String {
    format!("{title}\n{body}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;

    static SHARED_EXTRACTOR: OnceLock<DateExtractor> = OnceLock::new();

    fn get_extractor() -> &'static DateExtractor {
        SHARED_EXTRACTOR.get_or_init(|| DateExtractor::new().unwrap())
    }

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_word_boundary_helper() {
        let text = "x2024-10-21 2024-10-21_ (2024-10-21)";
        assert!(!is_word_bounded(text, &(1..11)));
        assert!(!is_word_bounded(text, &(12..22)));
        assert!(is_word_bounded(text, &(25..35)));
        assert!(is_word_bounded("2024-10-21", &(0..10)));
    }

    #[test]
    fn test_japanese_letters_are_word_characters() {
        assert!(is_word_char('タ'));
        assert!(is_word_char('日'));
        assert!(is_word_char('_'));
        assert!(!is_word_char('。'));
        assert!(!is_word_char('['));
    }

    #[test]
    fn test_match_provenance() {
        let extractor = get_extractor();
        let text = "Entry for 2023-10-15, written later.";

        let matches = extractor.extract_matches(text);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].date, ymd(2023, 10, 15));
        assert_eq!(matches[0].matched, "2023-10-15");
        assert_eq!(&text[matches[0].span.clone()], "2023-10-15");
        assert_eq!(matches[0].pattern.name, "YYYY-MM-DD");
    }

    #[test]
    fn test_rejected_candidate_does_not_consume_text() {
        let extractor = get_extractor();

        // The first 8-digit window is glued to a ninth digit; the real date
        // after the space must still be found.
        let dates = extractor.extract("123456789 20231015");
        assert_eq!(dates, vec![ymd(2023, 10, 15)]);
    }

    #[test]
    fn test_multibyte_neighbours() {
        let extractor = get_extractor();

        assert_eq!(extractor.extract("日記「2023-10-15」"), vec![ymd(2023, 10, 15)]);
        assert!(extractor.extract("日記2023-10-15").is_empty());
        assert_eq!(extractor.extract("日記2023年10月15日晴れ"), vec![ymd(2023, 10, 15)]);
    }

    #[test]
    fn test_first_date_follows_table_order() {
        let extractor = get_extractor();
        let text = "20240101 then 2023-10-15";
        assert_eq!(extractor.first_date(text), Some(ymd(2023, 10, 15)));
        assert_eq!(extractor.first_date("nothing here"), None);
    }

    #[test]
    fn test_dotted_date_needs_literal_dots() {
        let extractor = get_extractor();

        assert_eq!(extractor.extract("1999-2023.10.15"), vec![ymd(2023, 10, 15)]);
        assert!(extractor.extract("2023x10x15").is_empty());
        assert!(extractor.extract("2023-10x15").is_empty());
    }

    #[test]
    fn test_document_text_joins_title_and_body() {
        assert_eq!(document_text("20240102_entry", "body"), "20240102_entry\nbody");
    }
}
