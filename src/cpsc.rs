use reqwest::blocking::Client;
use serde_json::Value;

use crate::config::Settings;
use crate::domain::{SearchFields, Source};
use crate::error::RecallError;
use crate::normalize::{CPSC_CLASSIFICATION, normalize_cpsc};
use crate::upstream::{self, ProbeOutcome};

pub trait CpscClient: Send + Sync {
    /// Fetches one page of raw recalls, narrowed by `query` over the
    /// upstream fields behind `fields`.
    fn fetch(
        &self,
        query: Option<&str>,
        fields: SearchFields,
    ) -> Result<Vec<Value>, RecallError>;
    fn probe(&self) -> ProbeOutcome;
}

#[derive(Clone)]
pub struct CpscHttpClient {
    client: Client,
    probe_client: Client,
    base_url: String,
    recall_date_start: String,
}

impl CpscHttpClient {
    pub fn new(settings: &Settings) -> Result<Self, RecallError> {
        let client =
            upstream::build_client(Source::Cpsc, &settings.user_agent, settings.cpsc_timeout())?;
        let probe_client =
            upstream::build_client(Source::Cpsc, &settings.user_agent, settings.probe_timeout())?;
        Ok(Self {
            client,
            probe_client,
            base_url: settings.cpsc_base_url.clone(),
            recall_date_start: settings.cpsc_recall_date_start.clone(),
        })
    }

    fn base_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("format", "json".to_string()),
            ("RecallDateStart", self.recall_date_start.clone()),
        ]
    }

    fn fetch_page(&self, query: Option<&str>) -> Result<Vec<Value>, RecallError> {
        let mut params = self.base_params();
        if let Some(query) = query {
            params.push(("RecallTitle", query.to_string()));
        }
        tracing::info!(url = %self.base_url, search = query.is_some(), "fetching CPSC recalls");
        let request = self.client.get(&self.base_url).query(&params);
        let response = upstream::send(Source::Cpsc, request)?;
        let payload = upstream::read_json(Source::Cpsc, response)?;
        extract_records(payload)
    }
}

impl CpscClient for CpscHttpClient {
    fn fetch(
        &self,
        query: Option<&str>,
        fields: SearchFields,
    ) -> Result<Vec<Value>, RecallError> {
        upstream::fetch_with_query_fallback(
            Source::Cpsc,
            narrowing_query(query, fields),
            |query| self.fetch_page(query),
            |records, query| filter_locally(records, query, fields),
        )
    }

    fn probe(&self) -> ProbeOutcome {
        upstream::probe(self.probe_client.get(&self.base_url).query(&self.base_params()))
    }
}

/// The query worth sending upstream. Every CPSC record carries the same
/// classification, so a classification-searching query contained in it
/// matches the whole page and is not narrowed.
pub fn narrowing_query(query: Option<&str>, fields: SearchFields) -> Option<&str> {
    query.filter(|query| {
        let needle = query.trim().to_lowercase();
        !(fields == SearchFields::WithClassification
            && CPSC_CLASSIFICATION.to_lowercase().contains(&needle))
    })
}

/// Local stand-in for the upstream title search over the canonical fields.
pub fn filter_locally(records: Vec<Value>, query: &str, fields: SearchFields) -> Vec<Value> {
    upstream::filter_locally(records, query, fields, normalize_cpsc)
}

/// The CPSC endpoints answer with a bare JSON array.
pub fn extract_records(payload: Value) -> Result<Vec<Value>, RecallError> {
    match payload {
        Value::Array(records) => Ok(records),
        _ => Err(RecallError::UpstreamPayload {
            upstream: Source::Cpsc,
            message: "expected a JSON array".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn bare_array_payload() {
        let records = extract_records(json!([{"RecallID": 1}, {"RecallID": 2}])).unwrap();
        assert_eq!(records.len(), 2);
        assert_matches!(
            extract_records(json!({"error": "nope"})),
            Err(RecallError::UpstreamPayload {
                upstream: Source::Cpsc,
                ..
            })
        );
    }

    #[test]
    fn local_filter_covers_every_composited_field() {
        let records = vec![
            json!({"Title": "Heater", "ProductDescriptions": "lead paint coating"}),
            json!({"Title": "Crib", "Description": "Slats can loosen"}),
            json!({"Title": "Kettle", "Manufacturers": "Boil Co", "ManufacturerCountries": "Peru"}),
            json!({"Title": "Lamp", "Injuries": "Two minor burns"}),
        ];
        for (query, title) in [
            ("lead paint", "Heater"),
            ("SLATS", "Crib"),
            ("of peru", "Kettle"),
            ("burns", "Lamp"),
        ] {
            let kept = filter_locally(records.clone(), query, SearchFields::Standard);
            assert_eq!(kept.len(), 1, "query {query:?}");
            assert_eq!(kept[0]["Title"], title);
        }
    }

    #[test]
    fn classification_queries_skip_narrowing() {
        assert_eq!(
            narrowing_query(Some("Consumer"), SearchFields::WithClassification),
            None
        );
        assert_eq!(
            narrowing_query(Some("consumer"), SearchFields::Standard),
            Some("consumer")
        );
        assert_eq!(
            narrowing_query(Some("stroller"), SearchFields::WithClassification),
            Some("stroller")
        );
        assert_eq!(narrowing_query(None, SearchFields::WithClassification), None);
    }
}
