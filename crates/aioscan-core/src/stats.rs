//! Global statistics: full recomputation from per-domain counters, and the
//! derived presentation view served to read-only callers.
//!
//! Keyword totals count domain-keyword pairs (rankings), not unique keyword
//! text: the same query ranked by five domains contributes five.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::keywords::{IntentCounts, SearchIntent};

/// Severity thresholds as inclusive lower bounds on affected percentage,
/// evaluated in descending order.
const CRITICAL_THRESHOLD: f64 = 75.0;
const HIGH_THRESHOLD: f64 = 50.0;
const MEDIUM_THRESHOLD: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    /// Classify a domain by the share of its analyzed keywords that are affected.
    ///
    /// A domain with no analyzed keywords is `Low`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn classify(affected: i64, total: i64) -> Self {
        if total <= 0 {
            return Severity::Low;
        }
        let percent = affected as f64 / total as f64 * 100.0;
        if percent >= CRITICAL_THRESHOLD {
            Severity::Critical
        } else if percent >= HIGH_THRESHOLD {
            Severity::High
        } else if percent >= MEDIUM_THRESHOLD {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High Risk",
            Severity::Medium => "Medium",
            Severity::Low => "Low Risk",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityHistogram {
    pub critical: i64,
    pub high: i64,
    pub medium: i64,
    pub low: i64,
}

impl SeverityHistogram {
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
    }

    #[must_use]
    pub fn get(&self, severity: Severity) -> i64 {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }
}

/// The per-domain counters the aggregator sums.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DomainCounters {
    pub keywords_analyzed: i64,
    pub keywords_with_overview: i64,
    pub by_intent: IntentCounts,
    pub total_search_volume: i64,
    pub overview_search_volume: i64,
}

/// The single global statistics row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStats {
    pub total_domains: i64,
    pub total_keywords: i64,
    pub keywords_with_overview: i64,
    /// Affected keyword share across all domains, one decimal place.
    pub avg_overview_percent: f64,
    pub total_search_volume: i64,
    pub overview_search_volume: i64,
    /// Affected search-volume share, one decimal place.
    pub overview_volume_percent: f64,
    pub by_intent: IntentCounts,
    pub severity: SeverityHistogram,
    pub updated_at: DateTime<Utc>,
}

impl GlobalStats {
    #[must_use]
    pub fn empty(updated_at: DateTime<Utc>) -> Self {
        Self {
            total_domains: 0,
            total_keywords: 0,
            keywords_with_overview: 0,
            avg_overview_percent: 0.0,
            total_search_volume: 0,
            overview_search_volume: 0,
            overview_volume_percent: 0.0,
            by_intent: IntentCounts::default(),
            severity: SeverityHistogram::default(),
            updated_at,
        }
    }

    /// Compares every figure except `updated_at`.
    #[must_use]
    pub fn same_figures(&self, other: &GlobalStats) -> bool {
        let mut other = other.clone();
        other.updated_at = self.updated_at;
        *self == other
    }

    /// Derive the presentation view: tier shares and per-intent estimates.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn view(&self) -> StatsView {
        let share = |count: i64| -> i64 {
            if self.total_domains > 0 {
                (count as f64 / self.total_domains as f64 * 100.0).round() as i64
            } else {
                0
            }
        };

        let severity_tiers = Severity::ALL
            .iter()
            .map(|&severity| {
                let count = self.severity.get(severity);
                SeverityTier {
                    name: severity,
                    label: severity.label(),
                    count,
                    percent: share(count),
                }
            })
            .collect();

        // Per-intent affected counts are not stored; estimate with the overall rate.
        let overall_rate = if self.total_keywords > 0 {
            self.keywords_with_overview as f64 / self.total_keywords as f64
        } else {
            0.0
        };
        let intents = SearchIntent::ALL
            .iter()
            .map(|&intent| {
                let keywords_count = self.by_intent.get(intent);
                IntentStat {
                    intent,
                    label: intent.label(),
                    keywords_count,
                    overview_count: (keywords_count as f64 * overall_rate).round() as i64,
                    overview_percent: (overall_rate * 100.0).round() as i64,
                }
            })
            .filter(|stat| stat.keywords_count > 0)
            .collect();

        StatsView {
            total_domains: self.total_domains,
            total_keywords: self.total_keywords,
            avg_overview_percent: self.avg_overview_percent.round() as i64,
            severity_tiers,
            impact: ImpactStats {
                total_search_volume: self.total_search_volume,
                overview_search_volume: self.overview_search_volume,
                overview_percent: self.overview_volume_percent.round() as i64,
            },
            intents,
            intent_keywords_total: self.by_intent.total(),
            updated_at: self.updated_at,
        }
    }
}

/// Recompute global statistics from scratch over every domain's counters.
///
/// Deterministic for a given input and safe to run concurrently with
/// itself; zero domains produce an all-zero row.
#[must_use]
pub fn compute_global_stats(domains: &[DomainCounters], now: DateTime<Utc>) -> GlobalStats {
    let mut stats = GlobalStats::empty(now);

    for d in domains {
        stats.total_domains += 1;
        stats.total_keywords += d.keywords_analyzed;
        stats.keywords_with_overview += d.keywords_with_overview;
        stats.total_search_volume += d.total_search_volume;
        stats.overview_search_volume += d.overview_search_volume;
        stats.by_intent += d.by_intent;
        stats
            .severity
            .record(Severity::classify(d.keywords_with_overview, d.keywords_analyzed));
    }

    stats.avg_overview_percent =
        percent_one_decimal(stats.keywords_with_overview, stats.total_keywords);
    stats.overview_volume_percent =
        percent_one_decimal(stats.overview_search_volume, stats.total_search_volume);
    stats
}

/// `part / whole × 100` rounded to one decimal; zero when `whole` is not positive.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn percent_one_decimal(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 1000.0).round() / 10.0
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityTier {
    pub name: Severity,
    pub label: &'static str,
    pub count: i64,
    pub percent: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactStats {
    pub total_search_volume: i64,
    pub overview_search_volume: i64,
    pub overview_percent: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentStat {
    pub intent: SearchIntent,
    pub label: &'static str,
    pub keywords_count: i64,
    pub overview_count: i64,
    pub overview_percent: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsView {
    pub total_domains: i64,
    pub total_keywords: i64,
    pub avg_overview_percent: i64,
    pub severity_tiers: Vec<SeverityTier>,
    pub impact: ImpactStats,
    pub intents: Vec<IntentStat>,
    pub intent_keywords_total: i64,
    pub updated_at: DateTime<Utc>,
}
