//! Query expansion into a bounded set of search variants.

use sleuth_client::{GenerationOptions, TextGenerator};
use sleuth_core::{AppConfig, CacheDb, CacheKey, Query, QueryVariant};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Planner tunables projected from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Upper bound on variants, original included.
    pub max_variants: usize,
    pub timeout: Duration,
    pub cache_ttl: Duration,
}

impl From<&AppConfig> for PlannerConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_variants: config.max_variants,
            timeout: config.generation_timeout(),
            cache_ttl: config.cache_ttl(),
        }
    }
}

/// Expands a query into up to `max_variants` reformulations.
#[derive(Clone)]
pub struct QueryPlanner {
    generator: Option<Arc<dyn TextGenerator>>,
    db: CacheDb,
    config: PlannerConfig,
}

impl QueryPlanner {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, db: CacheDb, config: PlannerConfig) -> Self {
        Self { generator, db, config }
    }

    /// Variants for `query`, original first, unique by fingerprint.
    ///
    /// Never fails: a missing generator, a generation error, or a timeout
    /// all yield just the original.
    pub async fn plan(&self, query: &Query) -> Vec<QueryVariant> {
        let original = QueryVariant::original(query);
        let key = CacheKey::plan(query.fingerprint.clone());

        match self.db.get_json::<Vec<QueryVariant>>(&key).await {
            Ok(Some(cached)) if cached.first().is_some_and(|v| v.fingerprint == original.fingerprint) => {
                tracing::debug!(query = %query.fingerprint, variants = cached.len(), "plan cache hit");
                return assemble(original, cached.into_iter().skip(1).map(|v| v.text), self.config.max_variants);
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "plan cache read failed"),
        }

        let Some(generator) = &self.generator else {
            return vec![original];
        };
        if self.config.max_variants <= 1 {
            return vec![original];
        }

        let variants = self.expand(generator.as_ref(), query, original).await;

        // Degraded plans are cached too, so a repeat within the ttl asks for
        // the same variants the search cache already holds.
        if let Err(e) = self.db.put_json(&key, &variants, self.config.cache_ttl).await {
            tracing::warn!(error = %e, "plan cache write failed");
        }

        variants
    }

    async fn expand(&self, generator: &dyn TextGenerator, query: &Query, original: QueryVariant) -> Vec<QueryVariant> {
        let prompt = build_prompt(&query.text, self.config.max_variants - 1);
        let options = GenerationOptions::new(200, 0.7);

        let raw = match tokio::time::timeout(self.config.timeout, generator.generate(&prompt, options)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                tracing::warn!(query = %query.fingerprint, error = %e, "variant generation failed");
                return vec![original];
            }
            Err(_) => {
                tracing::warn!(query = %query.fingerprint, "variant generation timed out");
                return vec![original];
            }
        };

        let variants = assemble(original, parse_candidates(&raw), self.config.max_variants);
        tracing::info!(query = %query.fingerprint, variants = variants.len(), "query planned");
        variants
    }
}

fn build_prompt(query: &str, count: usize) -> String {
    format!(
        "Given this user query: \"{query}\"\n\n\
         Generate {count} different search query variations that would help find comprehensive information.\n\
         Make them specific, diverse, and complementary to each other.\n\n\
         Return ONLY a JSON array of strings, nothing else. Example format:\n\
         [\"query 1\", \"query 2\", \"query 3\"]\n"
    )
}

/// Candidate strings from a model reply.
///
/// Accepts a JSON array, optionally inside a fenced code block; anything
/// else is read one candidate per line with list markers stripped.
pub fn parse_candidates(raw: &str) -> Vec<String> {
    let body = strip_fences(raw);

    if let Ok(list) = serde_json::from_str::<Vec<String>>(body) {
        return list;
    }

    if let (Some(start), Some(end)) = (body.find('['), body.rfind(']'))
        && start < end
        && let Ok(list) = serde_json::from_str::<Vec<String>>(&body[start..=end])
    {
        return list;
    }

    body.lines()
        .map(|line| strip_list_marker(line).trim_end_matches(',').trim_matches('"').trim().to_string())
        .filter(|line| !line.is_empty() && !line.starts_with('[') && !line.starts_with(']'))
        .collect()
}

/// Drop a leading `-`, `*`, `1.` or `1)` marker.
fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix(['-', '*']) {
        return rest.trim_start();
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0
        && let Some(rest) = line[digits..].strip_prefix(['.', ')'])
    {
        return rest.trim_start();
    }
    line
}

fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.split("```").next().unwrap_or(rest).trim()
}

/// Original first, then unique non-empty candidates, capped at `max`.
fn assemble(original: QueryVariant, candidates: impl IntoIterator<Item = String>, max: usize) -> Vec<QueryVariant> {
    let mut seen = HashSet::from([original.fingerprint.clone()]);
    let mut variants = vec![original];

    for candidate in candidates {
        if variants.len() >= max.max(1) {
            break;
        }
        if let Some(v) = QueryVariant::paraphrase(&candidate)
            && seen.insert(v.fingerprint.clone())
        {
            variants.push(v);
        }
    }

    variants
}
