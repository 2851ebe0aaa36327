use std::sync::Arc;
use std::thread;

use serde::Serialize;

use crate::aggregate::{Filters, SourceCounts, aggregate};
use crate::cache::{CacheKey, FreshnessCache};
use crate::config::{DegradePolicy, Settings};
use crate::cpsc::CpscClient;
use crate::domain::{Limit, Recall, SearchFields, SearchQuery, Source, SourceScope};
use crate::error::RecallError;
use crate::fallback;
use crate::fda::FdaClient;
use crate::normalize::{RawBatch, normalize};
use crate::stats::{Stats, summarize};
use crate::upstream::ProbeOutcome;

#[derive(Debug, Clone, Default)]
pub struct ListRequest {
    pub search: Option<SearchQuery>,
    pub classification: Option<String>,
    pub scope: SourceScope,
    pub limit: Option<Limit>,
}

impl ListRequest {
    /// Validates raw caller parameters. A blank search or classification is
    /// treated as absent; the limit defaults to and is clamped at
    /// `max_list_limit`.
    pub fn parse(
        search: Option<&str>,
        classification: Option<&str>,
        source: Option<&str>,
        limit: Option<&str>,
        settings: &Settings,
    ) -> Result<Self, RecallError> {
        let search = match search.map(str::trim) {
            None | Some("") => None,
            Some(text) => Some(text.parse()?),
        };
        let classification = classification
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        Ok(Self {
            search,
            classification,
            scope: SourceScope::parse(source)?,
            limit: Some(Limit::parse(
                limit,
                settings.max_list_limit,
                settings.max_list_limit,
            )?),
        })
    }
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: SearchQuery,
    pub scope: SourceScope,
    pub limit: Limit,
}

impl SearchRequest {
    pub fn parse(
        query: Option<&str>,
        source: Option<&str>,
        limit: Option<&str>,
        settings: &Settings,
    ) -> Result<Self, RecallError> {
        Ok(Self {
            query: query.unwrap_or_default().parse()?,
            scope: SourceScope::parse(source)?,
            limit: Limit::parse(
                limit,
                settings.default_search_limit,
                settings.max_search_limit,
            )?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AppliedFilters {
    pub search: Option<String>,
    pub classification: Option<String>,
    pub source: Option<Source>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecallsResult {
    pub records: Vec<Recall>,
    pub count: usize,
    pub sources: SourceCounts,
    pub filters: AppliedFilters,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsResult {
    pub stats: Stats,
    pub cached: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub query: String,
    pub records: Vec<Recall>,
    pub count: usize,
    pub sources: SourceCounts,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshResult {
    pub counts: SourceCounts,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub fda_cached: bool,
    pub cpsc_cached: bool,
    pub stats_cached: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub fda: ProbeOutcome,
    pub cpsc: ProbeOutcome,
    pub cache: CacheStatus,
}

pub struct App<F: FdaClient, C: CpscClient> {
    settings: Settings,
    cache: Arc<FreshnessCache>,
    fda: F,
    cpsc: C,
}

impl<F: FdaClient, C: CpscClient> App<F, C> {
    pub fn new(settings: Settings, cache: Arc<FreshnessCache>, fda: F, cpsc: C) -> Self {
        Self {
            settings,
            cache,
            fda,
            cpsc,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn cache(&self) -> &FreshnessCache {
        &self.cache
    }

    pub fn list_recalls(&self, request: &ListRequest) -> RecallsResult {
        let fields = SearchFields::Standard;
        let batches = self.load_scope(request.scope, request.search.as_ref(), fields);
        let filters = Filters {
            search: request.search.as_ref().map(SearchQuery::lowercase),
            search_fields: fields,
            classification: request.classification.clone(),
            limit: request.limit,
        };
        let aggregated = aggregate(batches, &filters);

        RecallsResult {
            count: aggregated.records.len(),
            records: aggregated.records,
            sources: aggregated.per_source,
            filters: AppliedFilters {
                search: request.search.as_ref().map(|query| query.to_string()),
                classification: request.classification.clone(),
                source: match request.scope {
                    SourceScope::Both => None,
                    SourceScope::Only(source) => Some(source),
                },
                limit: request.limit.map(|limit| limit.get()),
            },
        }
    }

    pub fn stats(&self) -> StatsResult {
        if let Some(stats) = self.cache.get_stats() {
            tracing::info!(key = %CacheKey::Stats, "cache hit");
            return StatsResult {
                stats: stats.as_ref().clone(),
                cached: true,
            };
        }

        let mut records = Vec::new();
        for (_, batch) in self.load_scope(SourceScope::Both, None, SearchFields::Standard) {
            records.extend(batch.iter().cloned());
        }
        let stats = summarize(&records, self.cache.now().date_naive());
        self.cache.put_stats(Arc::new(stats.clone()));

        StatsResult {
            stats,
            cached: false,
        }
    }

    pub fn search(&self, request: &SearchRequest) -> SearchResult {
        let fields = SearchFields::WithClassification;
        let batches = self.load_scope(request.scope, Some(&request.query), fields);
        let filters = Filters {
            search: Some(request.query.lowercase()),
            search_fields: fields,
            classification: None,
            limit: Some(request.limit),
        };
        let aggregated = aggregate(batches, &filters);

        SearchResult {
            query: request.query.to_string(),
            count: aggregated.records.len(),
            records: aggregated.records,
            sources: aggregated.per_source,
        }
    }

    /// Drops every cache entry and eagerly refetches both sources.
    pub fn refresh(&self) -> RefreshResult {
        self.cache.invalidate_all();
        tracing::info!("cache invalidated, refetching all sources");

        let mut counts = SourceCounts::default();
        for (source, batch) in self.load_scope(SourceScope::Both, None, SearchFields::Standard) {
            counts.set(source, batch.len());
        }
        RefreshResult { counts }
    }

    /// Minimal request against each upstream; bypasses normalization and the cache.
    pub fn probe(&self) -> ProbeResult {
        let (fda, cpsc) = thread::scope(|threads| {
            let fda = threads.spawn(|| self.fda.probe());
            let cpsc = threads.spawn(|| self.cpsc.probe());
            (
                fda.join()
                    .unwrap_or_else(|_| ProbeOutcome::unreachable("FDA probe panicked")),
                cpsc.join()
                    .unwrap_or_else(|_| ProbeOutcome::unreachable("CPSC probe panicked")),
            )
        });

        ProbeResult {
            fda,
            cpsc,
            cache: CacheStatus {
                fda_cached: self.cache.is_valid(CacheKey::FdaRecalls),
                cpsc_cached: self.cache.is_valid(CacheKey::CpscRecalls),
                stats_cached: self.cache.is_valid(CacheKey::Stats),
            },
        }
    }

    fn load_scope(
        &self,
        scope: SourceScope,
        search: Option<&SearchQuery>,
        fields: SearchFields,
    ) -> Vec<(Source, Arc<Vec<Recall>>)> {
        let sources = scope.sources();
        if let [source] = sources.as_slice() {
            return vec![(*source, self.load_source(*source, search, fields))];
        }

        thread::scope(|threads| {
            let handles = sources
                .iter()
                .map(|&source| {
                    let handle = threads.spawn(move || self.load_source(source, search, fields));
                    (source, handle)
                })
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .map(|(source, handle)| {
                    let recalls = handle.join().unwrap_or_else(|_| {
                        tracing::error!(%source, "source loader panicked");
                        self.degraded(source)
                    });
                    (source, recalls)
                })
                .collect()
        })
    }

    /// Searches go straight to the adapter and are never cached; plain
    /// listings are served from the cache and populate it on a miss.
    fn load_source(
        &self,
        source: Source,
        search: Option<&SearchQuery>,
        fields: SearchFields,
    ) -> Arc<Vec<Recall>> {
        if search.is_none() {
            if let Some(recalls) = self.cache.get_recalls(source) {
                tracing::info!(key = %CacheKey::for_source(source), "cache hit");
                return recalls;
            }
            tracing::info!(key = %CacheKey::for_source(source), "cache miss");
        }

        match self.fetch_raw(source, search.map(SearchQuery::as_str), fields) {
            Ok(batch) => {
                let normalized = normalize(&batch);
                tracing::info!(
                    %source,
                    fetched = batch.len(),
                    normalized = normalized.recalls.len(),
                    "normalized recalls"
                );
                let recalls = Arc::new(normalized.recalls);
                if search.is_none() {
                    self.cache.put_recalls(source, recalls.clone());
                }
                recalls
            }
            Err(err) => {
                tracing::warn!(%source, error = %err, "upstream unavailable, degrading");
                self.degraded(source)
            }
        }
    }

    fn fetch_raw(
        &self,
        source: Source,
        query: Option<&str>,
        fields: SearchFields,
    ) -> Result<RawBatch, RecallError> {
        let records = match source {
            Source::Fda => self.fda.fetch(query, fields)?,
            Source::Cpsc => self.cpsc.fetch(query, fields)?,
        };
        Ok(RawBatch::new(source, records))
    }

    fn degraded(&self, source: Source) -> Arc<Vec<Recall>> {
        match self.settings.degrade {
            DegradePolicy::Empty => Arc::new(Vec::new()),
            DegradePolicy::Static => Arc::new(normalize(&fallback::sample_batch(source)).recalls),
        }
    }
}
