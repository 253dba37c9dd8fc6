use serde::{Deserialize, Serialize};

/// Search intent as classified by the upstream provider.
///
/// Anything the provider sends that is not one of the three explicit
/// categories collapses to [`SearchIntent::Informational`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchIntent {
    Informational,
    Commercial,
    Transactional,
    Navigational,
}

impl SearchIntent {
    pub const ALL: [SearchIntent; 4] = [
        SearchIntent::Informational,
        SearchIntent::Commercial,
        SearchIntent::Transactional,
        SearchIntent::Navigational,
    ];

    /// Map a raw provider label onto an intent, case-insensitively.
    #[must_use]
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(str::to_ascii_lowercase).as_deref() {
            Some("commercial") => SearchIntent::Commercial,
            Some("transactional") => SearchIntent::Transactional,
            Some("navigational") => SearchIntent::Navigational,
            _ => SearchIntent::Informational,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SearchIntent::Informational => "informational",
            SearchIntent::Commercial => "commercial",
            SearchIntent::Transactional => "transactional",
            SearchIntent::Navigational => "navigational",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            SearchIntent::Informational => "Informational",
            SearchIntent::Commercial => "Commercial",
            SearchIntent::Transactional => "Transactional",
            SearchIntent::Navigational => "Navigational",
        }
    }
}

impl std::fmt::Display for SearchIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse of the canonical lowercase name, for stored values.
impl std::str::FromStr for SearchIntent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SearchIntent::ALL
            .into_iter()
            .find(|intent| intent.as_str() == s)
            .ok_or_else(|| format!("unknown search intent '{s}'"))
    }
}

/// One ranking keyword for a domain, with its derived risk score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredKeyword {
    pub keyword: String,
    pub search_volume: i64,
    pub position: i32,
    pub intent: SearchIntent,
    pub etv: i64,
    pub has_ai_overview: bool,
    pub risk_score: f64,
}

impl ScoredKeyword {
    /// Builds a keyword record and computes its risk score.
    #[must_use]
    pub fn new(
        keyword: String,
        search_volume: i64,
        position: i32,
        intent: SearchIntent,
        etv: i64,
        has_ai_overview: bool,
    ) -> Self {
        Self {
            risk_score: risk_score(search_volume, has_ai_overview, position),
            keyword,
            search_volume,
            position,
            intent,
            etv,
            has_ai_overview,
        }
    }
}

/// Review-priority heuristic: `volume × (2.0 | 0.5) × 1/√max(position, 1)`.
///
/// Not a probability and not bounded; only meaningful for ordering.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn risk_score(search_volume: i64, has_ai_overview: bool, position: i32) -> f64 {
    let overview_multiplier = if has_ai_overview { 2.0 } else { 0.5 };
    let rank_multiplier = 1.0 / f64::from(position.max(1)).sqrt();
    search_volume as f64 * overview_multiplier * rank_multiplier
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentCounts {
    pub informational: i64,
    pub commercial: i64,
    pub transactional: i64,
    pub navigational: i64,
}

impl IntentCounts {
    pub fn increment(&mut self, intent: SearchIntent) {
        *self.slot_mut(intent) += 1;
    }

    #[must_use]
    pub fn get(&self, intent: SearchIntent) -> i64 {
        match intent {
            SearchIntent::Informational => self.informational,
            SearchIntent::Commercial => self.commercial,
            SearchIntent::Transactional => self.transactional,
            SearchIntent::Navigational => self.navigational,
        }
    }

    #[must_use]
    pub fn total(&self) -> i64 {
        self.informational + self.commercial + self.transactional + self.navigational
    }

    fn slot_mut(&mut self, intent: SearchIntent) -> &mut i64 {
        match intent {
            SearchIntent::Informational => &mut self.informational,
            SearchIntent::Commercial => &mut self.commercial,
            SearchIntent::Transactional => &mut self.transactional,
            SearchIntent::Navigational => &mut self.navigational,
        }
    }
}

impl std::ops::AddAssign for IntentCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.informational += rhs.informational;
        self.commercial += rhs.commercial;
        self.transactional += rhs.transactional;
        self.navigational += rhs.navigational;
    }
}

/// Aggregate counters over a full parsed keyword list. These become the
/// per-domain counters of a domain record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordStats {
    pub total: i64,
    pub with_overview: i64,
    pub without_overview: i64,
    pub by_intent: IntentCounts,
    pub total_search_volume: i64,
    pub overview_search_volume: i64,
}

impl KeywordStats {
    #[must_use]
    pub fn from_keywords(keywords: &[ScoredKeyword]) -> Self {
        let mut stats = Self::default();
        for kw in keywords {
            stats.total += 1;
            stats.total_search_volume += kw.search_volume;
            stats.by_intent.increment(kw.intent);
            if kw.has_ai_overview {
                stats.with_overview += 1;
                stats.overview_search_volume += kw.search_volume;
            } else {
                stats.without_overview += 1;
            }
        }
        stats
    }
}

/// Keyword as shown to callers; the risk score only decides ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayKeyword {
    pub keyword: String,
    pub search_volume: i64,
    pub position: i32,
    pub intent: SearchIntent,
    pub etv: i64,
    pub has_ai_overview: bool,
}

impl From<&ScoredKeyword> for DisplayKeyword {
    fn from(kw: &ScoredKeyword) -> Self {
        Self {
            keyword: kw.keyword.clone(),
            search_volume: kw.search_volume,
            position: kw.position,
            intent: kw.intent,
            etv: kw.etv,
            has_ai_overview: kw.has_ai_overview,
        }
    }
}

/// Affected/unaffected counts over the keywords actually returned to a caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryCounts {
    pub total: usize,
    pub with_overview: usize,
    pub without_overview: usize,
}

impl SummaryCounts {
    #[must_use]
    pub fn from_display(keywords: &[DisplayKeyword]) -> Self {
        let with_overview = keywords.iter().filter(|k| k.has_ai_overview).count();
        Self {
            total: keywords.len(),
            with_overview,
            without_overview: keywords.len() - with_overview,
        }
    }
}

/// Sorts by descending risk score and keeps the first `k`.
///
/// Ties keep their original relative order.
#[must_use]
pub fn top_by_risk(keywords: &[ScoredKeyword], k: usize) -> Vec<DisplayKeyword> {
    let mut ranked: Vec<&ScoredKeyword> = keywords.iter().collect();
    ranked.sort_by(|a, b| b.risk_score.total_cmp(&a.risk_score));
    ranked.into_iter().take(k).map(DisplayKeyword::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kw(volume: i64, position: i32, overview: bool, intent: SearchIntent) -> ScoredKeyword {
        ScoredKeyword::new(format!("kw-{volume}-{position}"), volume, position, intent, 0, overview)
    }

    #[test]
    fn risk_score_first_position_with_overview() {
        assert!((risk_score(1000, true, 1) - 2000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn risk_score_fourth_position_halves() {
        assert!((risk_score(1000, true, 4) - 1000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn risk_score_without_overview_and_zero_position() {
        assert!((risk_score(1000, false, 0) - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn intent_from_raw_falls_back_to_informational() {
        assert_eq!(SearchIntent::from_raw(Some("Commercial")), SearchIntent::Commercial);
        assert_eq!(SearchIntent::from_raw(Some("TRANSACTIONAL")), SearchIntent::Transactional);
        assert_eq!(SearchIntent::from_raw(Some("navigational")), SearchIntent::Navigational);
        assert_eq!(SearchIntent::from_raw(Some("local")), SearchIntent::Informational);
        assert_eq!(SearchIntent::from_raw(None), SearchIntent::Informational);
    }

    #[test]
    fn intent_serializes_lowercase() {
        let json = serde_json::to_string(&SearchIntent::Transactional).expect("serialize");
        assert_eq!(json, "\"transactional\"");
    }

    #[test]
    fn keyword_stats_invariants_hold() {
        let keywords = vec![
            kw(100, 1, true, SearchIntent::Commercial),
            kw(200, 2, false, SearchIntent::Informational),
            kw(300, 3, true, SearchIntent::Navigational),
        ];
        let stats = KeywordStats::from_keywords(&keywords);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.with_overview + stats.without_overview, stats.total);
        assert_eq!(stats.by_intent.total(), stats.total);
        assert_eq!(stats.total_search_volume, 600);
        assert_eq!(stats.overview_search_volume, 400);
    }

    #[test]
    fn keyword_stats_of_empty_list_is_zero() {
        assert_eq!(KeywordStats::from_keywords(&[]), KeywordStats::default());
    }

    #[test]
    fn top_by_risk_orders_and_truncates() {
        let keywords = vec![
            kw(10, 1, false, SearchIntent::Informational),
            kw(1000, 1, true, SearchIntent::Informational),
            kw(500, 1, true, SearchIntent::Informational),
        ];
        let top = top_by_risk(&keywords, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].search_volume, 1000);
        assert_eq!(top[1].search_volume, 500);
    }

    #[test]
    fn summary_counts_cover_only_given_keywords() {
        let keywords = vec![
            kw(10, 1, false, SearchIntent::Informational),
            kw(1000, 1, true, SearchIntent::Informational),
        ];
        let display = top_by_risk(&keywords, 15);
        let summary = SummaryCounts::from_display(&display);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.with_overview, 1);
        assert_eq!(summary.without_overview, 1);
    }
}
