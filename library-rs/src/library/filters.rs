//! Declarative filtering over tool lists
//!
//! A filter spec is a JSON object of named predicates; every recognized key
//! narrows the result set (logical AND across keys). Unknown keys are
//! logged and ignored rather than rejected.

use crate::library::tool_info::ToolInfo;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

static SIZE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(\d+(?:\.\d+)?)\s*([a-z]*)\s*$").unwrap());

/// Date formats accepted for `last_updated_days` comparisons
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse a human size string ("50MB", "1024") into bytes.
///
/// Units are b/kb/mb/gb with 1024 multipliers; a missing unit means bytes.
/// Unparseable input is treated as zero.
pub fn parse_size(size: &str) -> u64 {
    let caps = match SIZE_PATTERN.captures(size) {
        Some(c) => c,
        None => {
            warn!("unparseable size string: {}", size);
            return 0;
        }
    };

    let number: f64 = caps[1].parse().unwrap_or(0.0);
    let multiplier = match caps[2].to_lowercase().as_str() {
        "" | "b" => 1.0,
        "kb" => 1024.0,
        "mb" => 1024.0 * 1024.0,
        "gb" => 1024.0 * 1024.0 * 1024.0,
        unit => {
            warn!("unknown size unit: {}", unit);
            return 0;
        }
    };

    (number * multiplier) as u64
}

/// Size buckets for `get_filter_statistics`
#[derive(Debug, Clone, Default, Serialize)]
pub struct SizeDistribution {
    /// Under 1 MiB
    pub small: usize,
    /// 1 MiB to under 100 MiB
    pub medium: usize,
    /// 100 MiB and above
    pub large: usize,
}

/// Trust buckets for `get_filter_statistics`
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrustDistribution {
    /// Score 8.0 and above
    pub high: usize,
    /// Score 5.0 to under 8.0
    pub medium: usize,
    /// Score under 5.0
    pub low: usize,
    /// No score on record
    pub unrated: usize,
}

/// Aggregate counts over a tool list
#[derive(Debug, Clone, Default, Serialize)]
pub struct FilterStatistics {
    pub total_tools: usize,
    pub size_distribution: SizeDistribution,
    pub categories: HashMap<String, usize>,
    pub platforms: HashMap<String, usize>,
    pub trust_distribution: TrustDistribution,
}

/// Named-predicate filter over tool lists, with per-instance result cache
pub struct ToolFilter {
    cache: HashMap<String, Vec<ToolInfo>>,
}

impl ToolFilter {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
        }
    }

    /// Apply every recognized filter in `spec` as an AND-predicate.
    ///
    /// Identical (spec, tool set) pairs are answered from the cache until
    /// `clear_cache` is called. A non-object spec is ignored with a warning.
    pub fn apply_filters(&mut self, tools: &[ToolInfo], spec: &Value) -> Vec<ToolInfo> {
        let filters = match spec.as_object() {
            Some(map) => map,
            None => {
                warn!("filter spec is not an object; ignoring");
                return tools.to_vec();
            }
        };

        let cache_key = filter_cache_key(filters, tools);
        if let Some(cached) = self.cache.get(&cache_key) {
            debug!("filter cache hit");
            return cached.clone();
        }

        let mut result: Vec<ToolInfo> = tools.to_vec();
        for (name, value) in filters {
            result = apply_one_filter(result, name, value);
        }

        self.cache.insert(cache_key, result.clone());
        result
    }

    /// Drop all cached filter results
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Number of cached result sets
    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    /// Sorted, deduplicated category names across a tool list
    pub fn get_available_categories(&self, tools: &[ToolInfo]) -> Vec<String> {
        let set: BTreeSet<String> = tools.iter().map(|t| t.category.clone()).collect();
        set.into_iter().collect()
    }

    /// Sorted, deduplicated tags across a tool list
    pub fn get_available_tags(&self, tools: &[ToolInfo]) -> Vec<String> {
        let set: BTreeSet<String> = tools.iter().flat_map(|t| t.tags.iter().cloned()).collect();
        set.into_iter().collect()
    }

    /// Size, category, platform and trust distributions for a tool list
    pub fn get_filter_statistics(&self, tools: &[ToolInfo]) -> FilterStatistics {
        let mut stats = FilterStatistics {
            total_tools: tools.len(),
            ..FilterStatistics::default()
        };

        for tool in tools {
            match tool.size {
                s if s < 1024 * 1024 => stats.size_distribution.small += 1,
                s if s < 100 * 1024 * 1024 => stats.size_distribution.medium += 1,
                _ => stats.size_distribution.large += 1,
            }

            *stats.categories.entry(tool.category.clone()).or_insert(0) += 1;

            for platform in &tool.platforms {
                *stats.platforms.entry(platform.to_lowercase()).or_insert(0) += 1;
            }

            match tool.trust_score {
                Some(s) if s >= 8.0 => stats.trust_distribution.high += 1,
                Some(s) if s >= 5.0 => stats.trust_distribution.medium += 1,
                Some(_) => stats.trust_distribution.low += 1,
                None => stats.trust_distribution.unrated += 1,
            }
        }

        stats
    }
}

impl Default for ToolFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Sorted `k=v` filter pairs joined with `|`, a `:`, then sorted tool ids
fn filter_cache_key(filters: &serde_json::Map<String, Value>, tools: &[ToolInfo]) -> String {
    let mut pairs: Vec<String> = filters
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();
    pairs.sort();

    let mut ids: Vec<&str> = tools.iter().map(|t| t.id.as_str()).collect();
    ids.sort_unstable();

    format!("{}:{}", pairs.join("|"), ids.join(":"))
}

fn apply_one_filter(tools: Vec<ToolInfo>, name: &str, value: &Value) -> Vec<ToolInfo> {
    match name {
        "max_size" => {
            let limit = size_limit(value);
            tools.into_iter().filter(|t| t.size <= limit).collect()
        }
        "min_size" => {
            let limit = size_limit(value);
            tools.into_iter().filter(|t| t.size >= limit).collect()
        }
        "dependencies" => {
            let available = lowercase_list(value);
            tools
                .into_iter()
                .filter(|t| {
                    t.dependencies
                        .iter()
                        .all(|dep| available.contains(&dep.to_lowercase()))
                })
                .collect()
        }
        "installation_types" => {
            let wanted = lowercase_list(value);
            tools
                .into_iter()
                .filter(|t| match &t.installation_type {
                    // Tools that never declare a type pass every type filter
                    None => true,
                    Some(declared) => {
                        let declared = declared.to_lowercase();
                        wanted
                            .iter()
                            .any(|w| declared.contains(w) || w.contains(&declared))
                    }
                })
                .collect()
        }
        "last_updated_days" => {
            let days = value.as_i64().unwrap_or(i64::MAX);
            tools
                .into_iter()
                .filter(|t| match &t.last_updated {
                    None => true,
                    Some(raw) => match parse_tool_date(raw) {
                        // Unparseable dates never exclude a tool
                        None => true,
                        Some(updated) => {
                            (Utc::now().naive_utc() - updated).num_days() <= days
                        }
                    },
                })
                .collect()
        }
        "platforms" => {
            let wanted = lowercase_list(value);
            tools
                .into_iter()
                .filter(|t| wanted.iter().any(|p| t.matches_platform(p)))
                .collect()
        }
        "trust_score_min" => {
            let min = value.as_f64().unwrap_or(0.0);
            tools
                .into_iter()
                .filter(|t| t.trust_score.unwrap_or(0.0) >= min)
                .collect()
        }
        "trust_score_max" => {
            let max = value.as_f64().unwrap_or(f64::MAX);
            tools
                .into_iter()
                .filter(|t| t.trust_score.unwrap_or(0.0) <= max)
                .collect()
        }
        "categories" => {
            let wanted = lowercase_list(value);
            tools
                .into_iter()
                .filter(|t| wanted.contains(&t.category.to_lowercase()))
                .collect()
        }
        "tags" => {
            // OR-logic: any matching tag keeps the tool
            let wanted = lowercase_list(value);
            tools
                .into_iter()
                .filter(|t| t.tags.iter().any(|tag| wanted.contains(&tag.to_lowercase())))
                .collect()
        }
        "exclude_tags" => {
            let excluded = lowercase_list(value);
            tools
                .into_iter()
                .filter(|t| {
                    !t.tags
                        .iter()
                        .any(|tag| excluded.contains(&tag.to_lowercase()))
                })
                .collect()
        }
        "authors" => {
            let wanted = lowercase_list(value);
            tools
                .into_iter()
                .filter(|t| wanted.contains(&t.author.to_lowercase()))
                .collect()
        }
        "versions" => {
            let patterns: Vec<Regex> = lowercase_list(value)
                .iter()
                .filter_map(|p| match Regex::new(p) {
                    Ok(re) => Some(re),
                    Err(e) => {
                        warn!("invalid version pattern {}: {}", p, e);
                        None
                    }
                })
                .collect();
            if patterns.is_empty() {
                return tools;
            }
            tools
                .into_iter()
                .filter(|t| patterns.iter().any(|re| re.is_match(&t.version)))
                .collect()
        }
        "has_screenshots" => {
            let wanted = value.as_bool().unwrap_or(true);
            tools
                .into_iter()
                .filter(|t| t.screenshots.is_empty() != wanted)
                .collect()
        }
        "verified_only" => {
            if value.as_bool().unwrap_or(false) {
                tools.into_iter().filter(|t| t.validated).collect()
            } else {
                tools
            }
        }
        unknown => {
            warn!("unknown filter key ignored: {}", unknown);
            tools
        }
    }
}

/// Size filter values accept raw byte counts or size strings
fn size_limit(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n.as_u64().unwrap_or_else(|| {
            n.as_f64().map(|f| f.max(0.0) as u64).unwrap_or(0)
        }),
        Value::String(s) => parse_size(s),
        _ => {
            warn!("unusable size filter value: {}", value);
            0
        }
    }
}

fn lowercase_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::to_lowercase)
            .collect(),
        Value::String(s) => vec![s.to_lowercase()],
        _ => Vec::new(),
    }
}

fn parse_tool_date(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    for format in DATE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    None
}
