use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::domain::{Recall, Source};
use crate::normalize::NOT_AVAILABLE;

pub const RECENT_WINDOW_DAYS: i64 = 30;
pub const REASON_KEY_CHARS: usize = 50;
pub const TRUNCATION_MARKER: &str = "...";
pub const TOP_REASON_COUNT: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub total_recalls: usize,
    pub fda_recalls: usize,
    pub cpsc_recalls: usize,
    pub recent_recalls: usize,
    pub classifications: BTreeMap<String, usize>,
    pub top_reasons: Vec<ReasonCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonCount {
    pub reason: String,
    pub count: usize,
}

pub fn summarize(records: &[Recall], today: NaiveDate) -> Stats {
    let window_start = today - TimeDelta::days(RECENT_WINDOW_DAYS);
    let mut stats = Stats {
        total_recalls: records.len(),
        ..Stats::default()
    };
    let mut reasons = ReasonTally::default();

    for recall in records {
        match recall.source {
            Source::Fda => stats.fda_recalls += 1,
            Source::Cpsc => stats.cpsc_recalls += 1,
        }

        if is_meaningful(&recall.classification) {
            *stats
                .classifications
                .entry(recall.classification.clone())
                .or_insert(0) += 1;
        }

        if is_meaningful(&recall.reason_for_recall) {
            reasons.add(reason_key(&recall.reason_for_recall));
        }

        if parse_compact_date(&recall.date)
            .is_some_and(|date| date >= window_start && date <= today)
        {
            stats.recent_recalls += 1;
        }
    }

    stats.top_reasons = reasons.top(TOP_REASON_COUNT);
    stats
}

/// Grouping key for a reason: the first 50 characters, marked when cut.
pub fn reason_key(reason: &str) -> String {
    if reason.chars().count() > REASON_KEY_CHARS {
        let mut key = reason.chars().take(REASON_KEY_CHARS).collect::<String>();
        key.push_str(TRUNCATION_MARKER);
        key
    } else {
        reason.to_string()
    }
}

/// Parses a strict 8-digit `YYYYMMDD` calendar date.
pub fn parse_compact_date(value: &str) -> Option<NaiveDate> {
    if value.len() != 8 || !value.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y%m%d").ok()
}

fn is_meaningful(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && trimmed != NOT_AVAILABLE
}

/// Counts keyed by first appearance so ties keep encounter order.
#[derive(Default)]
struct ReasonTally {
    index: HashMap<String, usize>,
    counts: Vec<ReasonCount>,
}

impl ReasonTally {
    fn add(&mut self, key: String) {
        match self.index.get(&key) {
            Some(position) => self.counts[*position].count += 1,
            None => {
                self.index.insert(key.clone(), self.counts.len());
                self.counts.push(ReasonCount {
                    reason: key,
                    count: 1,
                });
            }
        }
    }

    fn top(mut self, n: usize) -> Vec<ReasonCount> {
        self.counts.sort_by(|a, b| b.count.cmp(&a.count));
        self.counts.truncate(n);
        self.counts
    }
}
