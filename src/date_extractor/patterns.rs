// WHY: The pattern table is the compatibility surface of the extractor.
// Order here is evaluation order and therefore result order.

use chrono::NaiveDate;

/// How the digit groups of a lexical match map onto calendar fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layout {
    /// Year, month and day appear in that order (`2023-10-15`, `2023年10月15日`)
    YearMonthDay,
    /// Month, day and year appear in that order (`10/15/2023`)
    MonthDayYear,
    /// `YYYYMMDD` packed into the first digit group; later groups are ignored
    Compact,
}

impl Layout {
    /// Convert a lexical match into a calendar date
    ///
    /// Returns `None` when the fields do not form a real Gregorian date
    /// (month 13, February 30th, year 0, ...).
    pub fn to_date(self, matched: &str) -> Option<NaiveDate> {
        let mut groups = matched
            .split(|c: char| !c.is_ascii_digit())
            .filter(|group| !group.is_empty());

        match self {
            Layout::YearMonthDay => {
                let year = groups.next()?;
                let month = groups.next()?;
                let day = groups.next()?;
                calendar_date(year, month, day)
            }
            Layout::MonthDayYear => {
                let month = groups.next()?;
                let day = groups.next()?;
                let year = groups.next()?;
                calendar_date(year, month, day)
            }
            Layout::Compact => {
                let packed = groups.next()?;
                if packed.len() < 8 {
                    return None;
                }
                calendar_date(&packed[0..4], &packed[4..6], &packed[6..8])
            }
        }
    }
}

/// Build a date from decimal fields, rejecting anything outside the calendar
fn calendar_date(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    let day: u32 = day.parse().ok()?;

    // Year 0 is not a valid Gregorian year for diary entries
    if year < 1 {
        return None;
    }

    NaiveDate::from_ymd_opt(year, month, day)
}

/// One entry of the fixed date pattern table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatePattern {
    /// Short human-readable shape, used in logs and provenance
    pub name: &'static str,
    /// Lexical shape, without boundary assertions
    pub regex: &'static str,
    /// How matched digits map to year, month and day
    pub layout: Layout,
    /// Whether the match must sit between word boundaries
    pub word_bounded: bool,
}

/// The ordered pattern table
///
/// Digit classes are ASCII only. Boundaries are not part of the regexes;
/// the extractor checks them explicitly so that Unicode letters and `_`
/// count as word characters regardless of the matcher's own semantics.
pub const DATE_PATTERNS: &[DatePattern] = &[
    DatePattern {
        name: "YYYY-MM-DD",
        regex: r"[0-9]{4}-[0-9]{2}-[0-9]{2}",
        layout: Layout::YearMonthDay,
        word_bounded: true,
    },
    DatePattern {
        name: "YYYY/MM/DD",
        regex: r"[0-9]{4}/[0-9]{2}/[0-9]{2}",
        layout: Layout::YearMonthDay,
        word_bounded: true,
    },
    DatePattern {
        name: "MM-DD-YYYY",
        regex: r"[0-9]{2}-[0-9]{2}-[0-9]{4}",
        layout: Layout::MonthDayYear,
        word_bounded: true,
    },
    DatePattern {
        name: "MM/DD/YYYY",
        regex: r"[0-9]{2}/[0-9]{2}/[0-9]{4}",
        layout: Layout::MonthDayYear,
        word_bounded: true,
    },
    DatePattern {
        name: "YYYY年M月D日",
        regex: r"[0-9]{4}年[0-9]{1,2}月[0-9]{1,2}日",
        layout: Layout::YearMonthDay,
        word_bounded: false,
    },
    DatePattern {
        name: "YYYY.M.D",
        regex: r"[0-9]{4}\.[0-9]{1,2}\.[0-9]{1,2}",
        layout: Layout::YearMonthDay,
        word_bounded: true,
    },
    DatePattern {
        name: "YYYYMMDD",
        regex: r"[0-9]{8}",
        layout: Layout::Compact,
        word_bounded: true,
    },
    // WHY: the `_HHMM` suffix must be present, but only the date prefix converts
    DatePattern {
        name: "YYYYMMDD_HHMM",
        regex: r"[0-9]{8}_[0-9]{4}",
        layout: Layout::Compact,
        word_bounded: true,
    },
];
