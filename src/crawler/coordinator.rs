//! Crawler coordinator - main crawl orchestration logic
//!
//! This module sequences the four crawl stages:
//! 1. Organizations (or the single organization given on the command line)
//! 2. Repositories of each organization
//! 3. Pull requests of each repository
//! 4. Timelines of each pull request, fetched concurrently
//!
//! Every Query is looked up in the cache first. Entries never expire; a run
//! with caching disabled re-fetches everything and overwrites the entries.

use crate::config::Config;
use crate::crawler::engine::PaginatedFetcher;
use crate::crawler::fetcher::ApiClient;
use crate::crawler::query::Query;
use crate::crawler::scheduler::run_ordered;
use crate::output::CrawlStatistics;
use crate::storage::{CacheKey, CacheStore, FileCacheStore, Sanitizer};
use crate::HamsterError;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// Log progress every this many entities within a stage
const PROGRESS_INTERVAL: usize = 50;

/// A repository identified by owner and name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    /// Parses a `full_name` such as `octo/hello`
    pub fn parse(full_name: &str) -> Option<Self> {
        let (owner, name) = full_name.split_once('/')?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// A pull request identified by repository and number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRef {
    pub repo: RepoRef,
    pub number: u64,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    fetcher: PaginatedFetcher,
    cache: Arc<dyn CacheStore>,
    use_cache: bool,
    skip_repos: HashSet<String>,
    stats: CrawlStatistics,
}

impl Coordinator {
    /// Creates a coordinator writing its cache below `out_dir`
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `token` - API credential sent as a bearer token
    /// * `out_dir` - Root directory of the cache
    pub fn new(config: Config, token: &str, out_dir: &Path) -> Result<Self, HamsterError> {
        let client = ApiClient::from_config(&config, token)?;
        let fetcher = PaginatedFetcher::new(
            client,
            config.api.per_page,
            config.fetch.num_workers as usize,
        );
        let cache = FileCacheStore::new(out_dir, Sanitizer::from_config(&config.cache));

        Ok(Self::with_parts(config, fetcher, Arc::new(cache)))
    }

    /// Creates a coordinator from already built parts
    pub fn with_parts(
        config: Config,
        fetcher: PaginatedFetcher,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        let skip_repos = config.crawl.skip_repos.iter().cloned().collect();
        let use_cache = config.cache.enabled;

        Self {
            config: Arc::new(config),
            fetcher,
            cache,
            use_cache,
            skip_repos,
            stats: CrawlStatistics::new(),
        }
    }

    /// Runs all crawl stages
    ///
    /// # Arguments
    ///
    /// * `organization` - Restrict the crawl to this organization
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlStatistics)` - Every stage completed
    /// * `Err(HamsterError)` - A Query failed; entries stored so far stay valid
    pub async fn run(
        &mut self,
        organization: Option<&str>,
    ) -> Result<CrawlStatistics, HamsterError> {
        tracing::info!(
            "Starting crawl against {} (cache {}, {} workers)",
            self.fetcher.client().base_url(),
            if self.use_cache { "enabled" } else { "disabled" },
            self.fetcher.concurrency()
        );

        let organizations = self.collect_organizations(organization).await?;
        let repos = self.collect_repos(&organizations).await?;
        let pulls = self.collect_pulls(&repos).await?;
        self.collect_timelines(pulls).await?;

        self.stats.finish();
        tracing::info!(
            "Crawl completed: {} organizations, {} repositories, {} pull requests in {}s",
            self.stats.organizations,
            self.stats.repositories,
            self.stats.pull_requests,
            self.stats.duration().num_seconds()
        );

        Ok(self.stats.clone())
    }

    /// Stage 1: organization logins
    async fn collect_organizations(
        &mut self,
        organization: Option<&str>,
    ) -> Result<Vec<String>, HamsterError> {
        if let Some(login) = organization {
            tracing::info!("Restricting crawl to organization {}", login);
            return Ok(vec![login.to_string()]);
        }

        let query = Query::new("organizations").param("per_page", self.config.api.per_page);
        let records = self.cached_query(&CacheKey::organizations(), &query).await?;

        let logins = records
            .iter()
            .filter_map(|org| string_field(org, "login"))
            .collect::<Vec<_>>();
        tracing::info!("Collected {} organizations", logins.len());
        Ok(logins)
    }

    /// Stage 2: repositories of every organization
    async fn collect_repos(
        &mut self,
        organizations: &[String],
    ) -> Result<Vec<RepoRef>, HamsterError> {
        let mut repos = Vec::new();

        for (i, org) in organizations.iter().enumerate() {
            let Some(key) = checked_key(CacheKey::org_repos(org)) else {
                continue;
            };
            let query = Query::new(format!("orgs/{}/repos", org))
                .param("type", "all")
                .param("per_page", self.config.api.per_page);

            let records = self.cached_query(&key, &query).await?;
            self.stats.organizations += 1;

            repos.extend(
                records
                    .iter()
                    .filter_map(|repo| string_field(repo, "full_name"))
                    .filter_map(|full_name| RepoRef::parse(&full_name)),
            );

            log_progress("Repos from organizations", i + 1, organizations.len());
        }

        self.stats.repositories = repos.len() as u64;
        tracing::info!("Collected {} repositories", repos.len());
        Ok(repos)
    }

    /// Stage 3: pull requests of every repository
    async fn collect_pulls(&mut self, repos: &[RepoRef]) -> Result<Vec<PullRef>, HamsterError> {
        let mut pulls = Vec::new();

        for (i, repo) in repos.iter().enumerate() {
            if self.skip_repos.contains(&repo.full_name()) {
                tracing::info!("Skipping repository {}", repo.full_name());
                self.stats.skipped_repositories += 1;
                continue;
            }

            let Some(key) = checked_key(CacheKey::pulls(&repo.owner, &repo.name)) else {
                continue;
            };
            let query = Query::new(format!("repos/{}/{}/pulls", repo.owner, repo.name))
                .param("state", "all")
                .param("per_page", self.config.api.per_page);

            let records = self.cached_query(&key, &query).await?;
            pulls.extend(records.iter().filter_map(|pull| {
                let number = pull.get("number").and_then(Value::as_u64);
                if number.is_none() {
                    tracing::warn!("Pull request without number in {}", repo.full_name());
                }
                number.map(|number| PullRef {
                    repo: repo.clone(),
                    number,
                })
            }));

            log_progress("Pulls from repositories", i + 1, repos.len());
        }

        self.stats.pull_requests = pulls.len() as u64;
        tracing::info!("Collected {} pull requests", pulls.len());
        Ok(pulls)
    }

    /// Stage 4: timelines of every pull request
    ///
    /// Timelines of different pull requests run through the bounded worker
    /// pool; the pages of each timeline are fetched one after another, so
    /// at most `num-workers` requests are in flight. Cached timelines are
    /// decoded to detect corruption, then skipped.
    async fn collect_timelines(&mut self, pulls: Vec<PullRef>) -> Result<(), HamsterError> {
        let mut pending = Vec::new();

        for pull in pulls {
            let Some(key) = checked_key(CacheKey::timeline(
                &pull.repo.owner,
                &pull.repo.name,
                pull.number,
            )) else {
                continue;
            };

            if self.use_cache && self.cache.exists(&key) {
                match self.cache.load(&key) {
                    Ok(_) => {
                        self.stats.cache_hits += 1;
                        self.stats.timelines += 1;
                        continue;
                    }
                    Err(e) if e.is_corrupt() => {
                        tracing::warn!("{}; fetching again", e);
                        self.stats.corrupt_entries += 1;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            pending.push((pull, key));
        }

        tracing::info!(
            "Fetching {} timelines ({} cached)",
            pending.len(),
            self.stats.timelines
        );

        let total = pending.len();
        let per_page = self.config.api.per_page;
        let counts = run_ordered(pending, self.fetcher.concurrency(), |(pull, key)| {
            let fetcher = self.fetcher.clone();
            let cache = Arc::clone(&self.cache);
            async move {
                let query = Query::new(format!(
                    "repos/{}/{}/issues/{}/timeline",
                    pull.repo.owner, pull.repo.name, pull.number
                ))
                .param("per_page", per_page);

                let records = fetcher.fetch_with_concurrency(&query, 1).await?;
                cache.store(&key, &records)?;
                Ok::<_, HamsterError>(records.len())
            }
        })
        .await?;

        self.stats.fetched_queries += total as u64;
        self.stats.timelines += total as u64;
        tracing::info!(
            "Stored {} timelines with {} events",
            total,
            counts.iter().sum::<usize>()
        );
        Ok(())
    }

    /// Answers a Query from the cache, or fetches and stores it
    ///
    /// A corrupt entry is treated as a miss: it is re-fetched and overwritten.
    async fn cached_query(
        &mut self,
        key: &CacheKey,
        query: &Query,
    ) -> Result<Vec<Value>, HamsterError> {
        if self.use_cache && self.cache.exists(key) {
            match self.cache.load(key) {
                Ok(records) => {
                    tracing::debug!("Cache hit for {} ({} records)", key, records.len());
                    self.stats.cache_hits += 1;
                    return Ok(records);
                }
                Err(e) if e.is_corrupt() => {
                    tracing::warn!("{}; fetching again", e);
                    self.stats.corrupt_entries += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        let records = self.fetcher.fetch(query).await?;
        self.cache.store(key, &records)?;
        self.stats.fetched_queries += 1;
        Ok(records)
    }
}

/// Reads a string field from a record, warning when it is missing
fn string_field(record: &Value, field: &str) -> Option<String> {
    let value = record.get(field).and_then(Value::as_str).map(String::from);
    if value.is_none() {
        tracing::warn!("Record without '{}' field skipped", field);
    }
    value
}

/// Unwraps a cache key built from API data, skipping entities with unusable names
fn checked_key(key: Result<CacheKey, crate::storage::StorageError>) -> Option<CacheKey> {
    match key {
        Ok(key) => Some(key),
        Err(e) => {
            tracing::warn!("Skipping entity: {}", e);
            None
        }
    }
}

fn log_progress(stage: &str, done: usize, total: usize) {
    if done % PROGRESS_INTERVAL == 0 || done == total {
        tracing::info!("Progress: {} {}/{}", stage, done, total);
    }
}
