//! HTTP plumbing shared by the FDA and CPSC adapters.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::{Recall, SearchFields, Source};
use crate::error::RecallError;

const STATUS_BODY_CHARS: usize = 200;

/// Outcome of a minimal connectivity request against one upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeOutcome {
    pub reachable: bool,
    pub status_code: Option<u16>,
    pub error: Option<String>,
}

impl ProbeOutcome {
    pub fn unreachable(error: impl Into<String>) -> Self {
        Self {
            reachable: false,
            status_code: None,
            error: Some(error.into()),
        }
    }
}

pub fn build_client(
    upstream: Source,
    user_agent: &str,
    timeout: Duration,
) -> Result<Client, RecallError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(user_agent).map_err(|err| RecallError::HttpClient(err.to_string()))?,
    );
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(|err| RecallError::HttpClient(format!("{upstream}: {err}")))
}

pub fn send(upstream: Source, request: RequestBuilder) -> Result<Response, RecallError> {
    let response = request.send().map_err(|err| RecallError::UpstreamHttp {
        upstream,
        message: err.to_string(),
    })?;
    handle_status(upstream, response)
}

fn handle_status(upstream: Source, response: Response) -> Result<Response, RecallError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    Err(status_error(upstream, status, response.text().ok()))
}

/// Error for a non-success status, carrying the start of the response body.
pub fn status_error(upstream: Source, status: u16, body: Option<String>) -> RecallError {
    let message = body
        .map(|body| body.chars().take(STATUS_BODY_CHARS).collect::<String>())
        .filter(|body| !body.trim().is_empty())
        .unwrap_or_else(|| format!("{upstream} request failed"));
    RecallError::UpstreamStatus {
        upstream,
        status,
        message,
    }
}

pub fn read_json(upstream: Source, response: Response) -> Result<Value, RecallError> {
    let body = response.text().map_err(|err| RecallError::UpstreamHttp {
        upstream,
        message: err.to_string(),
    })?;
    parse_payload(upstream, &body)
}

pub fn parse_payload(upstream: Source, body: &str) -> Result<Value, RecallError> {
    serde_json::from_str(body).map_err(|err| RecallError::UpstreamPayload {
        upstream,
        message: err.to_string(),
    })
}

pub fn probe(request: RequestBuilder) -> ProbeOutcome {
    match request.send() {
        Ok(response) => {
            let status = response.status();
            ProbeOutcome {
                reachable: status.is_success(),
                status_code: Some(status.as_u16()),
                error: None,
            }
        }
        Err(err) => ProbeOutcome::unreachable(err.to_string()),
    }
}

/// Fetches one page, pushing `query` to the upstream's native search first.
///
/// If the narrowed request fails, the page is fetched once more without the
/// query and handed to `filter` together with the query.
pub fn fetch_with_query_fallback<F, L>(
    upstream: Source,
    query: Option<&str>,
    mut fetch: F,
    filter: L,
) -> Result<Vec<Value>, RecallError>
where
    F: FnMut(Option<&str>) -> Result<Vec<Value>, RecallError>,
    L: FnOnce(Vec<Value>, &str) -> Vec<Value>,
{
    let Some(query) = query.map(str::trim).filter(|query| !query.is_empty()) else {
        return fetch(None);
    };

    match fetch(Some(query)) {
        Ok(records) => Ok(records),
        Err(err) => {
            tracing::warn!(%upstream, error = %err, "native search failed, filtering locally");
            let records = fetch(None)?;
            let fetched = records.len();
            let kept = filter(records, query);
            tracing::debug!(%upstream, fetched, kept = kept.len(), "filtered locally");
            Ok(kept)
        }
    }
}

/// Keeps the raw records whose canonical form matches `query`
/// case-insensitively over `fields`, so the fallback agrees with the
/// filtering applied after normalization. Non-objects are dropped.
pub fn filter_locally<N>(
    records: Vec<Value>,
    query: &str,
    fields: SearchFields,
    normalize: N,
) -> Vec<Value>
where
    N: Fn(&Map<String, Value>, usize) -> Recall,
{
    let needle = query.trim().to_lowercase();
    records
        .into_iter()
        .enumerate()
        .filter(|(index, record)| {
            record
                .as_object()
                .is_some_and(|object| normalize(object, *index).matches_search(&needle, fields))
        })
        .map(|(_, record)| record)
        .collect()
}
