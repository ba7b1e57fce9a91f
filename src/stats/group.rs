//! Grouped aggregation over survey records.
//!
//! One-pass engines that turn a stream of records into per-group tallies.
//! Grouping always accumulates raw weights; downstream tables derive their
//! estimates from the tallies afterwards.

use crate::models::SurveyRecord;
use crate::stats::estimator::WeightedTally;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;

/// A category value with an explicit missing bucket.
///
/// `Missing` orders after every known category, so descriptive tables list
/// it last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category<C> {
    Known(C),
    Missing,
}

impl<C: fmt::Display> fmt::Display for Category<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Known(value) => write!(f, "{}", value),
            Category::Missing => write!(f, "Missing"),
        }
    }
}

/// Tallies smoking outcomes per group key.
///
/// Rows with an unknown smoking status contribute to neither numerator nor
/// denominator; rows where `key_fn` returns `None` are skipped entirely.
pub fn tally_by<'a, I, K, F>(records: I, key_fn: F) -> HashMap<K, WeightedTally>
where
    I: IntoIterator<Item = &'a SurveyRecord>,
    K: Eq + Hash,
    F: Fn(&SurveyRecord) -> Option<K>,
{
    let mut groups: HashMap<K, WeightedTally> = HashMap::new();
    for record in records {
        let is_case = match record.smoker {
            Some(value) => value,
            None => continue,
        };
        let key = match key_fn(record) {
            Some(key) => key,
            None => continue,
        };
        groups.entry(key).or_default().observe(record.weight, is_case);
    }
    groups
}

/// Weighted totals for one category of a descriptive characteristic.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GroupSummary {
    /// Summed weight over all rows in the category.
    pub weight_all: f64,
    /// Tally restricted to rows with a known smoking status.
    pub smoking: WeightedTally,
}

impl GroupSummary {
    fn observe(&mut self, record: &SurveyRecord) {
        self.weight_all += record.weight;
        if let Some(is_case) = record.smoker {
            self.smoking.observe(record.weight, is_case);
        }
    }
}

/// Summarizes one characteristic: per-category weighted totals in codebook
/// order, with a trailing `Missing` bucket when the category is absent.
pub fn summarize_by<'a, I, C, F>(records: I, category_fn: F) -> BTreeMap<Category<C>, GroupSummary>
where
    I: IntoIterator<Item = &'a SurveyRecord>,
    C: Ord,
    F: Fn(&SurveyRecord) -> Option<C>,
{
    let mut groups: BTreeMap<Category<C>, GroupSummary> = BTreeMap::new();
    for record in records {
        let category = match category_fn(record) {
            Some(value) => Category::Known(value),
            None => Category::Missing,
        };
        groups.entry(category).or_default().observe(record);
    }
    groups
}
