use reqwest::blocking::Client;
use serde_json::Value;

use crate::config::Settings;
use crate::domain::{SearchFields, Source};
use crate::error::RecallError;
use crate::normalize::normalize_fda;
use crate::upstream::{self, ProbeOutcome};

/// openFDA fields behind the canonical product, reason and company.
pub const FDA_SEARCH_FIELDS: &[&str] =
    &["product_description", "reason_for_recall", "recalling_firm"];
pub const FDA_CLASSIFICATION_FIELD: &str = "classification";

pub trait FdaClient: Send + Sync {
    /// Fetches one page of raw enforcement reports, narrowed by `query`
    /// over the upstream fields behind `fields`.
    fn fetch(
        &self,
        query: Option<&str>,
        fields: SearchFields,
    ) -> Result<Vec<Value>, RecallError>;
    fn probe(&self) -> ProbeOutcome;
}

#[derive(Clone)]
pub struct FdaHttpClient {
    client: Client,
    probe_client: Client,
    base_url: String,
    page_size: usize,
}

impl FdaHttpClient {
    pub fn new(settings: &Settings) -> Result<Self, RecallError> {
        let client =
            upstream::build_client(Source::Fda, &settings.user_agent, settings.fda_timeout())?;
        let probe_client =
            upstream::build_client(Source::Fda, &settings.user_agent, settings.probe_timeout())?;
        Ok(Self {
            client,
            probe_client,
            base_url: settings.fda_base_url.clone(),
            page_size: settings.fda_page_size(),
        })
    }

    /// openFDA search expression OR-ing the query across the searchable fields.
    pub fn search_expression(query: &str, fields: SearchFields) -> String {
        let term = query.replace('"', " ");
        let term = term.trim();
        let classification = match fields {
            SearchFields::Standard => None,
            SearchFields::WithClassification => Some(FDA_CLASSIFICATION_FIELD),
        };
        FDA_SEARCH_FIELDS
            .iter()
            .copied()
            .chain(classification)
            .map(|field| format!("{field}:\"{term}\""))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn fetch_page(
        &self,
        query: Option<&str>,
        fields: SearchFields,
    ) -> Result<Vec<Value>, RecallError> {
        let mut params = vec![("limit".to_string(), self.page_size.to_string())];
        if let Some(query) = query {
            params.push(("search".to_string(), Self::search_expression(query, fields)));
        }
        tracing::info!(url = %self.base_url, search = query.is_some(), "fetching FDA recalls");
        let request = self.client.get(&self.base_url).query(&params);
        let response = upstream::send(Source::Fda, request)?;
        let payload = upstream::read_json(Source::Fda, response)?;
        extract_results(payload)
    }
}

impl FdaClient for FdaHttpClient {
    fn fetch(
        &self,
        query: Option<&str>,
        fields: SearchFields,
    ) -> Result<Vec<Value>, RecallError> {
        upstream::fetch_with_query_fallback(
            Source::Fda,
            query,
            |query| self.fetch_page(query, fields),
            |records, query| filter_locally(records, query, fields),
        )
    }

    fn probe(&self) -> ProbeOutcome {
        upstream::probe(self.probe_client.get(&self.base_url).query(&[("limit", "1")]))
    }
}

/// Local stand-in for openFDA search over the canonical fields.
pub fn filter_locally(records: Vec<Value>, query: &str, fields: SearchFields) -> Vec<Value> {
    upstream::filter_locally(records, query, fields, normalize_fda)
}

/// Pulls the `results` array out of an openFDA response envelope.
pub fn extract_results(payload: Value) -> Result<Vec<Value>, RecallError> {
    match payload {
        Value::Object(mut envelope) => match envelope.remove("results") {
            Some(Value::Array(results)) => Ok(results),
            Some(_) => Err(RecallError::UpstreamPayload {
                upstream: Source::Fda,
                message: "`results` is not an array".to_string(),
            }),
            None => Ok(Vec::new()),
        },
        _ => Err(RecallError::UpstreamPayload {
            upstream: Source::Fda,
            message: "expected a JSON object".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn search_expression_covers_all_fields() {
        let expr =
            FdaHttpClient::search_expression(" \"peanut\" butter ", SearchFields::Standard);
        assert_eq!(
            expr,
            "product_description:\"peanut  butter\" reason_for_recall:\"peanut  butter\" recalling_firm:\"peanut  butter\""
        );
    }

    #[test]
    fn keyword_search_expression_includes_classification() {
        let expr = FdaHttpClient::search_expression("Class I", SearchFields::WithClassification);
        assert!(expr.ends_with(" classification:\"Class I\""));
        assert!(expr.starts_with("product_description:\"Class I\""));
    }

    #[test]
    fn local_filter_matches_canonical_fields() {
        let records = vec![
            json!({
                "recall_number": "F-1",
                "product_description": "Spinach",
                "reason_for_recall": "Listeria",
                "recalling_firm": "Green Fields",
                "classification": "Class I"
            }),
            json!({
                "recall_number": "F-2",
                "product_description": "Class I brand crackers",
                "classification": "Class III"
            }),
        ];
        assert_eq!(
            filter_locally(records.clone(), "CLASS I", SearchFields::WithClassification).len(),
            2
        );
        let standard = filter_locally(records, "class i", SearchFields::Standard);
        assert_eq!(standard.len(), 1);
        assert_eq!(standard[0]["recall_number"], "F-2");
    }

    #[test]
    fn results_envelope() {
        let payload = json!({"meta": {}, "results": [{"recall_number": "F-1"}]});
        assert_eq!(extract_results(payload).unwrap().len(), 1);
        assert!(extract_results(json!({"meta": {}})).unwrap().is_empty());
        assert_matches!(
            extract_results(json!([1, 2])),
            Err(RecallError::UpstreamPayload { .. })
        );
    }
}
