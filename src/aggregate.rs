use std::sync::Arc;

use serde::Serialize;

use crate::domain::{Limit, Recall, SearchFields, Source};

/// Records fetched for each source, before any filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceCounts {
    pub fda_count: usize,
    pub cpsc_count: usize,
}

impl SourceCounts {
    pub fn get(&self, source: Source) -> usize {
        match source {
            Source::Fda => self.fda_count,
            Source::Cpsc => self.cpsc_count,
        }
    }

    pub fn set(&mut self, source: Source, count: usize) {
        match source {
            Source::Fda => self.fda_count = count,
            Source::Cpsc => self.cpsc_count = count,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Filters {
    pub search: Option<String>,
    pub search_fields: SearchFields,
    pub classification: Option<String>,
    pub limit: Option<Limit>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregated {
    pub records: Vec<Recall>,
    pub per_source: SourceCounts,
}

/// Merges per-source batches (FDA before CPSC, no deduplication), then
/// applies search, classification and finally the limit.
pub fn aggregate(mut batches: Vec<(Source, Arc<Vec<Recall>>)>, filters: &Filters) -> Aggregated {
    batches.sort_by_key(|(source, _)| *source);

    let mut per_source = SourceCounts::default();
    let mut records = Vec::with_capacity(batches.iter().map(|(_, batch)| batch.len()).sum());
    for (source, batch) in &batches {
        per_source.set(*source, batch.len());
        records.extend(batch.iter().cloned());
    }
    let merged = records.len();

    if let Some(needle) = filters
        .search
        .as_deref()
        .map(str::trim)
        .filter(|needle| !needle.is_empty())
    {
        let needle = needle.to_lowercase();
        records.retain(|recall| recall.matches_search(&needle, filters.search_fields));
    }

    if let Some(classification) = filters
        .classification
        .as_deref()
        .filter(|value| !value.trim().is_empty())
    {
        records.retain(|recall| recall.has_classification(classification));
    }

    if let Some(limit) = filters.limit {
        records.truncate(limit.get());
    }

    tracing::debug!(
        merged,
        returned = records.len(),
        fda = per_source.fda_count,
        cpsc = per_source.cpsc_count,
        "aggregated recalls"
    );

    Aggregated {
        records,
        per_source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recall(id: &str, product: &str, classification: &str, source: Source) -> Recall {
        Recall {
            id: id.to_string(),
            recall_number: id.to_string(),
            product_description: product.to_string(),
            reason_for_recall: "reason".to_string(),
            company: "company".to_string(),
            date: "20250101".to_string(),
            classification: classification.to_string(),
            status: "Ongoing".to_string(),
            distribution_pattern: "N/A".to_string(),
            product_quantity: "N/A".to_string(),
            source,
        }
    }

    fn batches() -> Vec<(Source, Arc<Vec<Recall>>)> {
        vec![
            (
                Source::Cpsc,
                Arc::new(vec![recall("c1", "Heater", "Consumer Product", Source::Cpsc)]),
            ),
            (
                Source::Fda,
                Arc::new(vec![
                    recall("f1", "Peanut butter", "Class I", Source::Fda),
                    recall("f2", "Heater", "Class II", Source::Fda),
                ]),
            ),
        ]
    }

    fn ids(aggregated: &Aggregated) -> Vec<&str> {
        aggregated
            .records
            .iter()
            .map(|recall| recall.id.as_str())
            .collect()
    }

    #[test]
    fn merge_puts_fda_first_and_keeps_duplicates() {
        let aggregated = aggregate(batches(), &Filters::default());
        assert_eq!(ids(&aggregated), vec!["f1", "f2", "c1"]);
        assert_eq!(aggregated.per_source.fda_count, 2);
        assert_eq!(aggregated.per_source.cpsc_count, 1);
    }

    #[test]
    fn classification_filter_is_case_insensitive_exact() {
        let filters = Filters {
            classification: Some("class i".to_string()),
            ..Filters::default()
        };
        let aggregated = aggregate(batches(), &filters);
        assert_eq!(ids(&aggregated), vec!["f1"]);
        assert_eq!(aggregated.per_source.get(Source::Fda), 2);
    }

    #[test]
    fn search_then_limit() {
        let filters = Filters {
            search: Some("HEATER".to_string()),
            limit: Some(Limit::new(1).unwrap()),
            ..Filters::default()
        };
        let aggregated = aggregate(batches(), &filters);
        assert_eq!(ids(&aggregated), vec!["f2"]);
    }

    #[test]
    fn classification_searchable_when_requested() {
        let mut filters = Filters {
            search: Some("consumer".to_string()),
            ..Filters::default()
        };
        assert!(aggregate(batches(), &filters).records.is_empty());
        filters.search_fields = SearchFields::WithClassification;
        assert_eq!(ids(&aggregate(batches(), &filters)), vec!["c1"]);
    }
}
