//! Fold snippets and full pages into one ranked, bounded context.

use sleuth_client::dedup_key;
use sleuth_core::{AppConfig, PageContent, SearchResult};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// Cap on a single item's text.
    pub item_max_chars: usize,
    /// Cap on the whole context.
    pub total_max_chars: usize,
}

impl From<&AppConfig> for MergeConfig {
    fn from(config: &AppConfig) -> Self {
        Self { item_max_chars: config.merge_item_max_chars, total_max_chars: config.context_max_chars }
    }
}

/// One source in the synthesis context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextItem {
    pub url: String,
    pub title: String,
    pub text: String,
    /// Provider of the underlying hit (`"page"` for page-only items).
    pub source: String,
    /// Best rank the url had across variants.
    pub rank: usize,
    /// True when `text` is full page content rather than a snippet.
    pub has_content: bool,
}

/// Ranked context handed to the synthesizer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedContext {
    pub items: Vec<ContextItem>,
}

impl MergedContext {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn urls(&self) -> Vec<String> {
        self.items.iter().map(|i| i.url.clone()).collect()
    }

    pub fn total_chars(&self) -> usize {
        self.items.iter().map(|i| i.text.chars().count()).sum()
    }
}

/// Merge snippets and pages.
///
/// Urls are unique in the output. A page replaces the snippet text for its
/// url. Items with full content come first, then lower rank, then among
/// ties the provider seen less often so far. Each text is cut to
/// `item_max_chars`, and items are dropped from the bottom until the total
/// fits `total_max_chars`; the last kept item may be shortened.
pub fn merge(snippets: &[SearchResult], pages: &[PageContent], config: &MergeConfig) -> MergedContext {
    let mut order: Vec<String> = Vec::new();
    let mut by_key: HashMap<String, ContextItem> = HashMap::new();

    for hit in snippets {
        if hit.url.trim().is_empty() {
            continue;
        }
        let key = dedup_key(&hit.url);
        match by_key.get_mut(&key) {
            Some(existing) => {
                if hit.rank < existing.rank {
                    existing.rank = hit.rank;
                    existing.source.clone_from(&hit.source);
                }
                if existing.text.chars().count() < hit.snippet.chars().count() {
                    existing.text.clone_from(&hit.snippet);
                }
            }
            None => {
                order.push(key.clone());
                by_key.insert(
                    key,
                    ContextItem {
                        url: hit.url.clone(),
                        title: hit.title.clone(),
                        text: hit.snippet.clone(),
                        source: hit.source.clone(),
                        rank: hit.rank,
                        has_content: false,
                    },
                );
            }
        }
    }

    for page in pages {
        let key = dedup_key(&page.url);
        match by_key.get_mut(&key) {
            Some(existing) => {
                existing.text.clone_from(&page.text);
                existing.has_content = true;
                if let Some(title) = &page.title {
                    existing.title.clone_from(title);
                }
            }
            None => {
                order.push(key.clone());
                by_key.insert(
                    key,
                    ContextItem {
                        url: page.url.clone(),
                        title: page.title.clone().unwrap_or_default(),
                        text: page.text.clone(),
                        source: "page".to_string(),
                        rank: usize::MAX,
                        has_content: true,
                    },
                );
            }
        }
    }

    let pool: Vec<ContextItem> = order.into_iter().filter_map(|k| by_key.remove(&k)).collect();
    let ranked = rank_items(pool);

    MergedContext { items: apply_budget(ranked, config) }
}

/// Greedy ordering: repeatedly take the best remaining item, where the
/// provider count so far breaks rank ties. Insertion order settles the rest.
fn rank_items(mut pool: Vec<ContextItem>) -> Vec<ContextItem> {
    let mut ranked = Vec::with_capacity(pool.len());
    let mut provider_counts: HashMap<String, usize> = HashMap::new();

    while !pool.is_empty() {
        let best = pool
            .iter()
            .enumerate()
            .min_by_key(|(idx, item)| {
                (
                    !item.has_content,
                    item.rank,
                    provider_counts.get(&item.source).copied().unwrap_or(0),
                    *idx,
                )
            })
            .map(|(idx, _)| idx)
            .unwrap_or(0);

        let item = pool.remove(best);
        *provider_counts.entry(item.source.clone()).or_default() += 1;
        ranked.push(item);
    }

    ranked
}

fn apply_budget(items: Vec<ContextItem>, config: &MergeConfig) -> Vec<ContextItem> {
    let mut remaining = config.total_max_chars;
    let mut kept = Vec::new();

    for mut item in items {
        if remaining == 0 {
            break;
        }
        let cap = config.item_max_chars.min(remaining);
        item.text = truncate(&item.text, cap);
        if item.text.is_empty() {
            continue;
        }
        remaining -= item.text.chars().count();
        kept.push(item);
    }

    kept
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
