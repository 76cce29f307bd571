//! Due-date inference for recommended tasks.
//!
//! A deadline is reverse-engineered from the program start date: each task
//! category has a default lead time, and title keywords override it with a
//! more specific one. The result always lands in `[today, start]`, except
//! when the program has already started, in which case a catch-up deadline
//! 30 days out is returned.

use chrono::{DateTime, Duration, Months, NaiveDate};

use crate::types::TaskCategory;

/// Days a task should be done before the program start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lead {
    DaysBefore(i64),
    /// Pinned to the start date itself.
    AtStart,
}

#[derive(Debug, Clone, Copy)]
pub struct KeywordRule {
    pub keywords: &'static [&'static str],
    pub lead: Lead,
}

#[derive(Debug, Clone, Copy)]
pub struct CategoryRules {
    pub category: TaskCategory,
    /// Checked in order; the first rule with a keyword in the title wins.
    pub rules: &'static [KeywordRule],
    pub default: Lead,
}

pub const CATCH_UP_DAYS: i64 = 30;
pub const OVERDUE_GRACE_DAYS: i64 = 2;
pub const DEFAULT_HORIZON_MONTHS: u32 = 3;

pub static DUE_DATE_RULES: [CategoryRules; 4] = [
    CategoryRules {
        category: TaskCategory::PreDeparture,
        rules: &[
            KeywordRule { keywords: &["签证", "VLS-TS"], lead: Lead::DaysBefore(60) },
            KeywordRule { keywords: &["公证", "认证"], lead: Lead::DaysBefore(90) },
            KeywordRule { keywords: &["住宿", "房"], lead: Lead::DaysBefore(75) },
            KeywordRule { keywords: &["机票"], lead: Lead::DaysBefore(45) },
            KeywordRule { keywords: &["行李", "采购"], lead: Lead::DaysBefore(14) },
        ],
        default: Lead::DaysBefore(30),
    },
    CategoryRules {
        category: TaskCategory::Arrival,
        rules: &[
            // The legal residency deadline falls after arrival; never schedule
            // past the start date.
            KeywordRule { keywords: &["OFII", "居留"], lead: Lead::AtStart },
            KeywordRule { keywords: &["开户", "银行"], lead: Lead::DaysBefore(2) },
            KeywordRule { keywords: &["手机", "卡"], lead: Lead::DaysBefore(3) },
        ],
        default: Lead::DaysBefore(1),
    },
    CategoryRules {
        category: TaskCategory::Study,
        rules: &[
            KeywordRule { keywords: &["注册"], lead: Lead::DaysBefore(7) },
            KeywordRule { keywords: &["书单", "预习"], lead: Lead::DaysBefore(20) },
        ],
        default: Lead::DaysBefore(5),
    },
    CategoryRules {
        category: TaskCategory::Life,
        rules: &[],
        default: Lead::DaysBefore(10),
    },
];

/// Lead time for a title within a category.
pub fn lead_for(title: &str, category: TaskCategory) -> Lead {
    DUE_DATE_RULES
        .iter()
        .find(|c| c.category == category)
        .map(|c| {
            c.rules
                .iter()
                .find(|r| r.keywords.iter().any(|k| title.contains(k)))
                .map(|r| r.lead)
                .unwrap_or(c.default)
        })
        .unwrap_or(Lead::DaysBefore(CATCH_UP_DAYS))
}

/// Parse a `YYYY-MM-DD` date or an RFC 3339 timestamp.
pub fn parse_start_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

/// Infer a deadline for `title` given the user's declared start date.
///
/// `today` is a calendar date; time of day plays no part.
pub fn infer_due_date(
    title: &str,
    category: TaskCategory,
    start_date: &str,
    today: NaiveDate,
) -> NaiveDate {
    let start = parse_start_date(start_date).unwrap_or_else(|| {
        today
            .checked_add_months(Months::new(DEFAULT_HORIZON_MONTHS))
            .unwrap_or(today + Duration::days(90))
    });

    if start < today {
        return today + Duration::days(CATCH_UP_DAYS);
    }

    let mut target = match lead_for(title, category) {
        Lead::AtStart => start,
        Lead::DaysBefore(days) => start - Duration::days(days),
    };

    if target < today {
        target = today + Duration::days(OVERDUE_GRACE_DAYS);
    }
    if target > start {
        target = start;
    }
    target
}

/// [`infer_due_date`] formatted as an ISO calendar date.
pub fn infer_due_date_iso(
    title: &str,
    category: TaskCategory,
    start_date: &str,
    today: NaiveDate,
) -> String {
    to_iso(infer_due_date(title, category, start_date, today))
}

pub fn to_iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
