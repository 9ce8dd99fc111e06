//! End-to-end `answer` pipeline.
//!
//! Planning → per-variant cache check → retrieval for misses → automation
//! decision → optional page fetches → merge → cache write-back →
//! synthesis. Every stage degrades instead of failing; the only error a
//! caller sees is an empty query.

use crate::automation::{AutomationConfig, BrowserAutomationEngine};
use crate::budget::Budget;
use crate::decider::{AutomationDecider, DeciderConfig};
use crate::merger::{MergeConfig, merge};
use crate::planner::{PlannerConfig, QueryPlanner};
use crate::retrieval::{RetrievalConfig, RetrievalEngine};
use crate::synthesizer::{AnswerSynthesizer, SynthesisConfig};
use sleuth_client::{
    BraveClient, BraveConfig, BrowserLauncher, ChatClient, ChatConfig, DisabledLauncher, DuckDuckGoClient,
    DuckDuckGoConfig, SearchProvider, SearxngClient, SearxngConfig, TextGenerator,
};
use sleuth_core::{
    AnswerBundle, AnswerOutcome, AppConfig, CacheDb, CacheKey, ConversationMemory, Error, NoopMemory, PageContent,
    Query, QueryVariant, SearchResult, SqliteMemory, VariantReport,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Prior turns pulled into the synthesis prompt.
const PRIOR_TURNS: usize = 3;

/// External collaborators the pipeline talks to.
pub struct Collaborators {
    /// Search providers in priority order.
    pub providers: Vec<Arc<dyn SearchProvider>>,
    pub generator: Option<Arc<dyn TextGenerator>>,
    pub launcher: Arc<dyn BrowserLauncher>,
    pub memory: Arc<dyn ConversationMemory>,
}

impl Collaborators {
    /// Build the production collaborators described by `config`.
    ///
    /// Brave is used only with an API key and SearXNG only with an
    /// endpoint; DuckDuckGo needs neither. A collaborator that cannot be
    /// constructed is logged and left out.
    pub fn from_config(config: &AppConfig, db: &CacheDb) -> Self {
        let mut providers: Vec<Arc<dyn SearchProvider>> = Vec::new();

        if let Ok(brave) = BraveConfig::from_app(config) {
            match BraveClient::new(brave) {
                Ok(client) => providers.push(Arc::new(client)),
                Err(e) => tracing::warn!(error = %e, "brave provider disabled"),
            }
        }

        match DuckDuckGoClient::new(DuckDuckGoConfig::from_app(config)) {
            Ok(client) => providers.push(Arc::new(client)),
            Err(e) => tracing::warn!(error = %e, "duckduckgo provider disabled"),
        }

        if let Some(searxng) = SearxngConfig::from_app(config) {
            match SearxngClient::new(searxng) {
                Ok(client) => providers.push(Arc::new(client)),
                Err(e) => tracing::warn!(error = %e, "searxng provider disabled"),
            }
        }

        let generator: Option<Arc<dyn TextGenerator>> = match ChatConfig::from_app(config).and_then(ChatClient::new) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                tracing::warn!(error = %e, "text generation disabled; answers fall back to snippets");
                None
            }
        };

        let memory: Arc<dyn ConversationMemory> =
            if config.memory_enabled { Arc::new(SqliteMemory::new(db.clone())) } else { Arc::new(NoopMemory) };

        Self { providers, generator, launcher: launcher_for(config), memory }
    }
}

#[cfg(feature = "render")]
fn launcher_for(config: &AppConfig) -> Arc<dyn BrowserLauncher> {
    if config.render_enabled {
        Arc::new(sleuth_client::ChromiumLauncher::default())
    } else {
        Arc::new(DisabledLauncher)
    }
}

#[cfg(not(feature = "render"))]
fn launcher_for(_config: &AppConfig) -> Arc<dyn BrowserLauncher> {
    Arc::new(DisabledLauncher)
}

/// Answers queries by coordinating every stage under one budget.
pub struct Orchestrator {
    db: CacheDb,
    planner: QueryPlanner,
    retrieval: RetrievalEngine,
    decider: AutomationDecider,
    automation: BrowserAutomationEngine,
    merge_config: MergeConfig,
    synthesizer: AnswerSynthesizer,
    memory: Arc<dyn ConversationMemory>,
    budget: Duration,
    cache_ttl: Duration,
}

impl Orchestrator {
    pub fn new(config: &AppConfig, db: CacheDb, collaborators: Collaborators) -> Self {
        let Collaborators { providers, generator, launcher, memory } = collaborators;

        tracing::info!(
            providers = ?providers.iter().map(|p| p.name().to_string()).collect::<Vec<_>>(),
            generator = generator.is_some(),
            "orchestrator ready"
        );

        Self {
            planner: QueryPlanner::new(generator.clone(), db.clone(), PlannerConfig::from(config)),
            retrieval: RetrievalEngine::new(providers, RetrievalConfig::from(config)),
            decider: AutomationDecider::new(generator.clone(), DeciderConfig::from(config)),
            automation: BrowserAutomationEngine::new(launcher, db.clone(), AutomationConfig::from(config)),
            merge_config: MergeConfig::from(config),
            synthesizer: AnswerSynthesizer::new(generator, SynthesisConfig::from(config)),
            memory,
            budget: config.budget(),
            cache_ttl: config.cache_ttl(),
            db,
        }
    }

    /// Build with production collaborators.
    pub fn from_config(config: &AppConfig, db: CacheDb) -> Self {
        let collaborators = Collaborators::from_config(config, &db);
        Self::new(config, db, collaborators)
    }

    pub fn cache(&self) -> &CacheDb {
        &self.db
    }

    /// Answer `raw`. Only an empty query is an error.
    pub async fn answer(&self, raw: &str, force_automation: bool) -> Result<AnswerBundle, Error> {
        let query = Query::new(raw);
        if query.is_empty() {
            return Err(Error::InvalidInput("query cannot be empty".into()));
        }

        let start = Instant::now();
        let budget = Budget::start(self.budget);
        tracing::info!(query = %query.fingerprint, force_automation, "answering");

        let prior = match self.memory.retrieve_relevant(&query.text, PRIOR_TURNS).await {
            Ok(turns) => turns,
            Err(e) => {
                tracing::warn!(error = %e, "memory lookup failed");
                Vec::new()
            }
        };

        let variants = tokio::select! {
            planned = self.planner.plan(&query) => planned,
            _ = budget.token().cancelled() => vec![QueryVariant::original(&query)],
        };

        // Cache check per variant.
        let mut per_variant: Vec<Vec<SearchResult>> = vec![Vec::new(); variants.len()];
        let mut reports = Vec::with_capacity(variants.len());
        let mut misses = Vec::new();

        for (idx, variant) in variants.iter().enumerate() {
            let key = CacheKey::search(variant.fingerprint.clone());
            let cached = match self.db.get_json::<Vec<SearchResult>>(&key).await {
                Ok(hit) => hit,
                Err(e) => {
                    tracing::warn!(variant = %variant.fingerprint, error = %e, "search cache read failed");
                    None
                }
            };

            let cache_hit = cached.is_some();
            if let Some(results) = cached {
                per_variant[idx] = results;
            } else {
                misses.push((idx, variant.clone()));
            }
            reports.push(VariantReport {
                text: variant.text.clone(),
                fingerprint: variant.fingerprint.clone(),
                cache_hit,
            });
        }

        let all_hits = misses.is_empty();
        tracing::debug!(variants = variants.len(), misses = misses.len(), "cache checked");

        // Retrieval for misses.
        let mut fresh = Vec::new();
        if !misses.is_empty() && !budget.is_exhausted() {
            for (idx, results) in self.retrieval.retrieve_all(misses, budget.token()).await {
                per_variant[idx].clone_from(&results);
                fresh.push((idx, results));
            }
        }

        let aggregated: Vec<SearchResult> = per_variant.into_iter().flatten().collect();
        let targets = self.automation.select_targets(&aggregated).await;

        // Deciding and automation.
        let (decision, pages): (_, Vec<PageContent>) = if all_hits && !force_automation {
            tracing::debug!("all variants cached; automation skipped");
            (None, self.automation.cached_pages(&targets).await)
        } else if budget.is_exhausted() {
            (None, Vec::new())
        } else {
            let decision = tokio::select! {
                d = self.decider.decide(&query, &aggregated, force_automation) => Some(d),
                _ = budget.token().cancelled() => None,
            };
            let pages = match &decision {
                Some(d) if d.value && !budget.is_exhausted() => {
                    tracing::info!(reason = %d.reason, targets = targets.len(), "running browser automation");
                    self.automation.fetch_all(&targets, budget.token()).await
                }
                _ => Vec::new(),
            };
            (decision, pages)
        };

        let context = merge(&aggregated, &pages, &self.merge_config);

        // Write-back. Empty lists are not cached so failed variants retry.
        for (idx, results) in fresh {
            if results.is_empty() {
                continue;
            }
            let key = CacheKey::search(variants[idx].fingerprint.clone());
            if let Err(e) = self.db.put_json(&key, &results, self.cache_ttl).await {
                tracing::warn!(variant = %variants[idx].fingerprint, error = %e, "search cache write failed");
            }
        }

        let synthesis = self.synthesizer.synthesize(&query, &context, &prior, &budget).await;
        let budget_exhausted = budget.is_exhausted();

        if synthesis.outcome != AnswerOutcome::Insufficient {
            let metadata = serde_json::json!({
                "sources": synthesis.sources,
                "outcome": synthesis.outcome,
                "pages": pages.len(),
            });
            if let Err(e) = self.memory.store(&query.text, &synthesis.text, &metadata).await {
                tracing::warn!(error = %e, "memory store failed");
            }
        }

        tracing::info!(
            query = %query.fingerprint,
            outcome = ?synthesis.outcome,
            sources = synthesis.sources.len(),
            budget_exhausted,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "answer ready"
        );

        Ok(AnswerBundle {
            text: synthesis.text,
            sources: synthesis.sources,
            variants: reports,
            outcome: synthesis.outcome,
            budget_exhausted,
            automation: decision,
        })
    }
}
