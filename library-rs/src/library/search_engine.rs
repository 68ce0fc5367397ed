//! Fuzzy and keyword search over tool records
//!
//! Name search scores in tiers (exact, prefix, substring, fuzzy ratio);
//! description search scores keyword hits at word boundaries. Results and
//! suggestions are cached per instance until `clear_cache`.

use crate::library::tool_info::ToolInfo;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use strsim::normalized_levenshtein;
use tracing::{debug, warn};

static WORD_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w{2,}").unwrap());

/// Query tokens that carry no search signal
const STOP_WORDS: [&str; 20] = [
    "the", "and", "for", "with", "that", "this", "from", "your", "you", "are", "was", "were",
    "has", "have", "had", "not", "but", "can", "will", "all",
];

/// Similarity floor below which fuzzy name matches are dropped
const FUZZY_FLOOR: f64 = 0.6;

/// Search and suggestion cache sizes, for diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct SearchCacheStats {
    pub search_entries: usize,
    pub suggestion_entries: usize,
}

/// Tiered search over in-memory tool lists
pub struct ToolSearchEngine {
    search_cache: HashMap<String, Vec<ToolInfo>>,
    suggestion_cache: HashMap<String, Vec<String>>,
}

impl ToolSearchEngine {
    pub fn new() -> Self {
        Self {
            search_cache: HashMap::new(),
            suggestion_cache: HashMap::new(),
        }
    }

    /// Rank tools against a name query.
    ///
    /// Exact match on name or id scores 1.0, prefix 0.9, substring 0.7.
    /// With `fuzzy`, edit-distance similarity of at least 0.6 scores
    /// `ratio * 0.6`; anything below the floor is excluded. Descending by
    /// score, ties keep encounter order.
    pub fn search_by_name(&mut self, tools: &[ToolInfo], query: &str, fuzzy: bool) -> Vec<ToolInfo> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }

        let cache_key = format!("name:{}:{}:{}", query, fuzzy, id_set_key(tools));
        if let Some(cached) = self.search_cache.get(&cache_key) {
            debug!("search cache hit: name query");
            return cached.clone();
        }

        let mut scored: Vec<(ToolInfo, f64)> = Vec::new();
        for tool in tools {
            if let Some(score) = name_score(tool, &query, fuzzy) {
                scored.push((tool.clone(), score));
            }
        }
        let result = rank(scored);

        self.search_cache.insert(cache_key, result.clone());
        result
    }

    /// Rank tools by description keyword relevance.
    ///
    /// Keywords are query tokens of three or more characters minus stop
    /// words. A word-boundary hit counts 1.0, a substring-only hit 0.5;
    /// the sum is normalized by keyword count and capped at 1.0. Tools
    /// scoring zero are excluded.
    pub fn search_by_description(&mut self, tools: &[ToolInfo], query: &str) -> Vec<ToolInfo> {
        let keywords = extract_keywords(query);
        if keywords.is_empty() {
            return Vec::new();
        }

        let cache_key = format!("desc:{}:{}", keywords.join(","), id_set_key(tools));
        if let Some(cached) = self.search_cache.get(&cache_key) {
            debug!("search cache hit: description query");
            return cached.clone();
        }

        let boundary_patterns: Vec<Regex> = keywords
            .iter()
            .filter_map(|kw| {
                RegexBuilder::new(&format!(r"\b{}\b", regex::escape(kw)))
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| warn!("keyword pattern failed for {}: {}", kw, e))
                    .ok()
            })
            .collect();

        let mut scored: Vec<(ToolInfo, f64)> = Vec::new();
        for tool in tools {
            let description = tool.description.to_lowercase();
            let mut score = 0.0;
            for (keyword, pattern) in keywords.iter().zip(&boundary_patterns) {
                if pattern.is_match(&description) {
                    score += 1.0;
                } else if description.contains(keyword) {
                    score += 0.5;
                }
            }
            let score = (score / keywords.len() as f64).min(1.0);
            if score > 0.0 {
                scored.push((tool.clone(), score));
            }
        }
        let result = rank(scored);

        self.search_cache.insert(cache_key, result.clone());
        result
    }

    /// OR-match on tags, ranked by how many of the requested tags overlap
    pub fn search_by_tags(&mut self, tools: &[ToolInfo], tags: &[String]) -> Vec<ToolInfo> {
        let wanted: HashSet<String> = tags.iter().map(|t| t.to_lowercase()).collect();
        if wanted.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(ToolInfo, f64)> = Vec::new();
        for tool in tools {
            let matches = tool
                .tags
                .iter()
                .filter(|tag| wanted.contains(&tag.to_lowercase()))
                .count();
            if matches > 0 {
                scored.push((tool.clone(), matches as f64));
            }
        }
        rank(scored)
    }

    /// Tools whose category matches by substring either direction, by name
    pub fn search_by_category(&self, tools: &[ToolInfo], category: &str) -> Vec<ToolInfo> {
        let category = category.to_lowercase();
        let mut result: Vec<ToolInfo> = tools
            .iter()
            .filter(|t| {
                let declared = t.category.to_lowercase();
                declared.contains(&category) || category.contains(&declared)
            })
            .cloned()
            .collect();
        result.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        result
    }

    /// Tools declaring the platform, `cross-platform` or `all`
    pub fn filter_by_platform(&self, tools: &[ToolInfo], platform: &str) -> Vec<ToolInfo> {
        tools
            .iter()
            .filter(|t| t.matches_platform(platform))
            .cloned()
            .collect()
    }

    /// Tools at or above a trust score; unrated tools count as 5.0
    pub fn filter_by_trust_level(&self, tools: &[ToolInfo], min: f64) -> Vec<ToolInfo> {
        tools
            .iter()
            .filter(|t| t.trust_score.unwrap_or(5.0) >= min)
            .cloned()
            .collect()
    }

    /// Free-text search OR'd internally, AND'd against structured filters.
    ///
    /// With a query, name and description results are unioned (dedup by id,
    /// name rank first). The set is then intersected with category matches,
    /// tag matches, the platform filter and the trust floor. Without a
    /// query or filters the input comes back unchanged.
    pub fn combined_search(
        &mut self,
        tools: &[ToolInfo],
        query: Option<&str>,
        categories: Option<&[String]>,
        tags: Option<&[String]>,
        platform: Option<&str>,
        min_trust: f64,
        fuzzy: bool,
    ) -> Vec<ToolInfo> {
        let mut result: Vec<ToolInfo> = match query.map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => {
                let mut seen: HashSet<String> = HashSet::new();
                let mut merged = Vec::new();
                for tool in self
                    .search_by_name(tools, q, fuzzy)
                    .into_iter()
                    .chain(self.search_by_description(tools, q))
                {
                    if seen.insert(tool.id.clone()) {
                        merged.push(tool);
                    }
                }
                merged
            }
            None => tools.to_vec(),
        };

        if let Some(categories) = categories.filter(|c| !c.is_empty()) {
            let mut matching: HashSet<String> = HashSet::new();
            for category in categories {
                for tool in self.search_by_category(tools, category) {
                    matching.insert(tool.id);
                }
            }
            result.retain(|t| matching.contains(&t.id));
        }

        if let Some(tags) = tags.filter(|t| !t.is_empty()) {
            let matching: HashSet<String> = self
                .search_by_tags(tools, tags)
                .into_iter()
                .map(|t| t.id)
                .collect();
            result.retain(|t| matching.contains(&t.id));
        }

        if let Some(platform) = platform {
            result.retain(|t| t.matches_platform(platform));
        }

        if min_trust > 0.0 {
            result.retain(|t| t.trust_score.unwrap_or(0.0) >= min_trust);
        }

        result
    }

    /// Sort a tool list by a named field.
    ///
    /// Supported: name, category, trust_score, size, date_added. An
    /// unknown field is logged and leaves the order unchanged.
    pub fn sort_tools(&self, tools: &[ToolInfo], by: &str, descending: bool) -> Vec<ToolInfo> {
        let mut sorted = tools.to_vec();
        match by {
            "name" => sorted.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase())),
            "category" => {
                sorted.sort_by(|a, b| a.category.to_lowercase().cmp(&b.category.to_lowercase()))
            }
            "trust_score" => sorted.sort_by(|a, b| {
                let a = a.trust_score.unwrap_or(0.0);
                let b = b.trust_score.unwrap_or(0.0);
                a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal)
            }),
            "size" => sorted.sort_by_key(|t| t.size),
            "date_added" => sorted.sort_by(|a, b| a.date_added.cmp(&b.date_added)),
            unknown => {
                warn!("unknown sort field: {}", unknown);
                return sorted;
            }
        }
        if descending {
            sorted.reverse();
        }
        sorted
    }

    /// Completion candidates for a partial query.
    ///
    /// Harvested from names, title-cased ids, categories, tags and
    /// description words; prefix-matched case-insensitively, sorted and
    /// capped at ten. Partials under two characters yield nothing.
    pub fn get_search_suggestions(&mut self, tools: &[ToolInfo], partial: &str) -> Vec<String> {
        let partial = partial.trim().to_lowercase();
        if partial.len() < 2 {
            return Vec::new();
        }

        let cache_key = format!("{}:{}", partial, id_set_key(tools));
        if let Some(cached) = self.suggestion_cache.get(&cache_key) {
            return cached.clone();
        }

        let mut candidates: BTreeSet<String> = BTreeSet::new();
        for tool in tools {
            candidates.insert(tool.name.clone());
            candidates.insert(title_case_id(&tool.id));
            candidates.insert(tool.category.clone());
            for tag in &tool.tags {
                candidates.insert(tag.clone());
            }
            for word in WORD_PATTERN.find_iter(&tool.description) {
                if word.as_str().len() >= 4 {
                    candidates.insert(word.as_str().to_string());
                }
            }
        }

        let suggestions: Vec<String> = candidates
            .into_iter()
            .filter(|c| c.to_lowercase().starts_with(&partial))
            .take(10)
            .collect();

        self.suggestion_cache.insert(cache_key, suggestions.clone());
        suggestions
    }

    /// Drop both result and suggestion caches
    pub fn clear_cache(&mut self) {
        self.search_cache.clear();
        self.suggestion_cache.clear();
    }

    pub fn get_cache_stats(&self) -> SearchCacheStats {
        SearchCacheStats {
            search_entries: self.search_cache.len(),
            suggestion_entries: self.suggestion_cache.len(),
        }
    }
}

impl Default for ToolSearchEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn name_score(tool: &ToolInfo, query: &str, fuzzy: bool) -> Option<f64> {
    let name = tool.name.to_lowercase();
    let id = tool.id.to_lowercase();

    if name == *query || id == *query {
        return Some(1.0);
    }
    if name.starts_with(query) || id.starts_with(query) {
        return Some(0.9);
    }
    if name.contains(query) || id.contains(query) {
        return Some(0.7);
    }
    if fuzzy {
        let ratio = normalized_levenshtein(query, &name).max(normalized_levenshtein(query, &id));
        if ratio >= FUZZY_FLOOR {
            return Some(ratio * 0.6);
        }
    }
    None
}

/// Stable descending sort by score, ties keep encounter order
fn rank(mut scored: Vec<(ToolInfo, f64)>) -> Vec<ToolInfo> {
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().map(|(tool, _)| tool).collect()
}

fn extract_keywords(query: &str) -> Vec<String> {
    let query = query.to_lowercase();
    WORD_PATTERN
        .find_iter(&query)
        .map(|m| m.as_str().to_string())
        .filter(|w| w.len() >= 3 && !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

/// Sorted input tool ids, the set component of every cache key
fn id_set_key(tools: &[ToolInfo]) -> String {
    let mut ids: Vec<&str> = tools.iter().map(|t| t.id.as_str()).collect();
    ids.sort_unstable();
    ids.join(":")
}

/// "virtual-display" becomes "Virtual Display"
fn title_case_id(id: &str) -> String {
    id.split(['-', '_'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
