//! Product recommendation engine.
//!
//! Candidates come from the catalog search, get an additive relevance
//! score against the interview answers, then pass through suitability
//! filters. At most three products are returned and the list is never
//! padded to reach three.

pub mod explain;
pub mod safety;

use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;
use tracing::{debug, warn};

use vita_common::{
    doc_certifications, doc_is_active, doc_search_text, doc_title, doc_to_product, Product,
    RecommendationConfig, Result,
};

use crate::concerns::ConcernKey;
use crate::store::CatalogSearch;

/// Outcome of one recommendation run.
#[derive(Debug, Clone, Default)]
pub struct Recommendation {
    /// Recommended products, best first, at most three.
    pub products: Vec<Product>,
    /// Relevance score per scored candidate title.
    pub scores: BTreeMap<String, f64>,
    /// Raw catalog documents per scored candidate title, kept for
    /// safety analysis.
    pub docs: BTreeMap<String, Value>,
    /// Safety warnings per recommended product title.
    pub warnings: BTreeMap<String, Vec<String>>,
}

impl Recommendation {
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn titles(&self) -> Vec<String> {
        self.products.iter().map(|p| p.title.clone()).collect()
    }
}

const HIGH_VALUE_KEYWORDS: &[&str] =
    &["fatigue", "energy", "immune", "memory", "concentration"];

fn term_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[a-zA-Z]{3,}").unwrap())
}

/// Alphabetic words of length >= 3, lowercased.
pub fn extract_terms(message: &str) -> Vec<String> {
    term_re()
        .find_iter(message)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

fn extract_concerns(context: &BTreeMap<String, Value>) -> Vec<ConcernKey> {
    context
        .get("concern")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .filter_map(|s| s.parse().ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Scores candidates and applies the suitability filters.
pub struct Recommender {
    config: RecommendationConfig,
}

impl Recommender {
    pub fn new(config: RecommendationConfig) -> Self {
        Self { config }
    }

    /// Run a full recommendation pass. A failing catalog is retried
    /// once; persistent failure yields an empty recommendation rather
    /// than an error, since a reply without products is still useful.
    pub async fn recommend(
        &self,
        catalog: &dyn CatalogSearch,
        message: Option<&str>,
        context: &BTreeMap<String, Value>,
        exclude_titles: &[String],
        include_titles: Option<&[String]>,
    ) -> Result<Recommendation> {
        let concerns = extract_concerns(context);
        let message_terms: Vec<String> = message.map(extract_terms).unwrap_or_default();

        let mut keywords: BTreeSet<String> = concerns
            .iter()
            .flat_map(|c| c.keywords().iter().map(|k| k.to_string()))
            .collect();
        keywords.extend(message_terms.iter().cloned());

        let health_goals: Vec<String> = concerns
            .iter()
            .flat_map(|c| c.health_goals().iter().map(|g| g.to_string()))
            .collect();

        let docs = match catalog
            .search(&message_terms, &health_goals, self.config.search_limit, include_titles)
            .await
        {
            Ok(docs) => docs,
            Err(err) => {
                warn!(error = %err, "catalog search failed, retrying once");
                match catalog
                    .search(&message_terms, &health_goals, self.config.search_limit, None)
                    .await
                {
                    Ok(docs) => docs,
                    Err(err) => {
                        warn!(error = %err, "catalog search failed twice, recommending nothing");
                        return Ok(Recommendation::default());
                    }
                }
            }
        };

        if docs.is_empty() {
            warn!(
                concerns = concerns.len(),
                goals = health_goals.len(),
                "no catalog candidates for recommendation"
            );
            return Ok(Recommendation::default());
        }

        let search_used_criteria =
            !health_goals.is_empty() || !message_terms.is_empty() || include_titles.is_some();

        let mut scored: Vec<(f64, Value)> = Vec::new();
        for doc in docs {
            if !doc_is_active(&doc) {
                continue;
            }
            let mut score = self.score_product(&doc, &keywords, &concerns, context);
            if score == 0.0 && (search_used_criteria || (keywords.is_empty() && concerns.is_empty()))
            {
                // Surfaced by the search itself; keep it eligible.
                score = 0.5;
            }
            if score > 0.0 {
                scored.push((score, doc));
            }
        }

        // Descending score, catalog order preserved on ties.
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut recommendation =
            self.filter(&scored, context, exclude_titles, include_titles);
        if recommendation.products.is_empty() && !exclude_titles.is_empty() {
            debug!("all candidates excluded, retrying without exclusions");
            recommendation = self.filter(&scored, context, &[], include_titles);
        }

        for (score, doc) in &scored {
            let title = doc_title(doc);
            recommendation.scores.insert(title.clone(), *score);
            recommendation.docs.insert(title, doc.clone());
        }
        for product in &recommendation.products {
            if let Some(doc) = recommendation.docs.get(&product.title) {
                let product_warnings = safety::warnings(doc, context);
                if !product_warnings.is_empty() {
                    recommendation
                        .warnings
                        .insert(product.title.clone(), product_warnings);
                }
            }
        }

        debug!(
            candidates = scored.len(),
            recommended = recommendation.products.len(),
            "recommendation complete"
        );
        Ok(recommendation)
    }

    fn filter(
        &self,
        scored: &[(f64, Value)],
        context: &BTreeMap<String, Value>,
        exclude_titles: &[String],
        include_titles: Option<&[String]>,
    ) -> Recommendation {
        let exclude_ayurveda = safety::should_exclude_ayurveda(context);
        let mut recommendation = Recommendation::default();

        for (score, doc) in scored {
            if *score < self.config.min_confidence {
                // Once anything qualified, everything below the floor
                // is noise; stop scanning.
                if !recommendation.products.is_empty() {
                    break;
                }
                continue;
            }

            let title = doc_title(doc);
            if let Some(include) = include_titles {
                if !include.iter().any(|t| *t == title) {
                    continue;
                }
            }
            if exclude_titles.iter().any(|t| *t == title) {
                continue;
            }
            if exclude_ayurveda && safety::is_ayurveda_product(doc) {
                continue;
            }
            if !safety::is_safe_and_suitable(doc, context) {
                continue;
            }

            recommendation.products.push(doc_to_product(doc));
            if recommendation.products.len() >= self.config.max_results {
                break;
            }
        }

        recommendation
    }

    /// Additive relevance score for one catalog document.
    pub fn score_product(
        &self,
        doc: &Value,
        keywords: &BTreeSet<String>,
        concerns: &[ConcernKey],
        context: &BTreeMap<String, Value>,
    ) -> f64 {
        let text = doc_search_text(doc).to_lowercase();
        let mut score = 0.0;

        for keyword in keywords {
            if text.contains(keyword.as_str()) {
                score += 1.0;
            }
        }

        let goal_tags = doc
            .get("healthGoals")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_lowercase)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        let goals_text = goal_tags.join(" ");

        for concern in concerns {
            if concern
                .health_goals()
                .iter()
                .any(|g| goal_tags.iter().any(|tag| tag.contains(&g.to_lowercase())))
            {
                score += 2.0;
            }
            if concern
                .keywords()
                .iter()
                .any(|k| goals_text.contains(k) || text.contains(k))
            {
                score += 1.5;
            }
        }

        let certs = doc_certifications(doc).join(" ").to_lowercase();
        match context.get("eating_habits").and_then(Value::as_str) {
            Some("vegan") if text.contains("vegan") || certs.contains("vegan") => score += 2.0,
            Some("vegetarian") if text.contains("vegetarian") || certs.contains("vegetarian") => {
                score += 1.5
            }
            _ => {}
        }

        for keyword in HIGH_VALUE_KEYWORDS {
            if keywords.contains(*keyword) && text.contains(keyword) {
                score += 0.5;
            }
        }

        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryCatalog;
    use approx::assert_relative_eq;
    use serde_json::json;

    fn sleep_doc() -> Value {
        json!({
            "title": {"en": "Night Rest"},
            "description": {"en": "Supports sleep and relaxation for restful nights"},
            "benefits": ["Better sleep", "Calm evenings"],
            "healthGoals": ["Sleep"],
            "status": true,
        })
    }

    fn ctx(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn recommender() -> Recommender {
        Recommender::new(RecommendationConfig::default())
    }

    #[test]
    fn keyword_and_goal_matches_add_up() {
        let context = ctx(&[("concern", json!(["sleep"]))]);
        let concerns = vec![ConcernKey::Sleep];
        let keywords: BTreeSet<String> = ConcernKey::Sleep
            .keywords()
            .iter()
            .map(|k| k.to_string())
            .collect();

        let score = recommender().score_product(&sleep_doc(), &keywords, &concerns, &context);
        // keywords "sleep", "rest", "relaxation", "calm" in text (+4.0),
        // direct goal match (+2.0), concern keyword match (+1.5)
        assert_relative_eq!(score, 7.5);
    }

    #[tokio::test]
    async fn inactive_products_never_surface() {
        let mut doc = sleep_doc();
        doc["status"] = json!(false);
        let catalog = InMemoryCatalog::new(vec![doc]);
        let context = ctx(&[("concern", json!(["sleep"]))]);

        let rec = recommender()
            .recommend(&catalog, None, &context, &[], None)
            .await
            .unwrap();
        assert!(rec.is_empty());
    }

    #[tokio::test]
    async fn at_most_three_products() {
        let docs: Vec<Value> = (0..6)
            .map(|i| {
                json!({
                    "title": {"en": format!("Sleep Aid {i}")},
                    "description": {"en": "sleep relaxation calm rest"},
                    "healthGoals": ["Sleep"],
                    "status": true,
                })
            })
            .collect();
        let catalog = InMemoryCatalog::new(docs);
        let context = ctx(&[("concern", json!(["sleep"]))]);

        let rec = recommender()
            .recommend(&catalog, None, &context, &[], None)
            .await
            .unwrap();
        assert_eq!(rec.products.len(), 3);
        assert_eq!(rec.docs.len(), 6);
    }

    #[tokio::test]
    async fn surfaced_but_unscored_candidates_keep_floor_score() {
        let doc = json!({
            "title": {"en": "Herbal Blend"},
            "description": {"en": "A gentle evening blend"},
            "healthGoals": ["Sleep"],
            "status": true,
        });
        let catalog = InMemoryCatalog::new(vec![doc]);
        // Concern key that shares no keywords with the document text;
        // the candidate is surfaced by title instead.
        let context = ctx(&[("concern", json!(["fitness"]))]);
        let include = vec!["Herbal Blend".to_string()];

        let rec = recommender()
            .recommend(&catalog, None, &context, &[], Some(&include))
            .await
            .unwrap();
        assert_relative_eq!(rec.scores["Herbal Blend"], 0.5);
        assert_eq!(rec.titles(), vec!["Herbal Blend".to_string()]);
    }

    #[tokio::test]
    async fn excluded_titles_are_skipped_until_nothing_is_left() {
        let catalog = InMemoryCatalog::new(vec![sleep_doc()]);
        let context = ctx(&[("concern", json!(["sleep"]))]);
        let exclude = vec!["Night Rest".to_string()];

        // The sole candidate is excluded, so the exclusion is dropped
        // rather than recommending nothing.
        let rec = recommender()
            .recommend(&catalog, None, &context, &exclude, None)
            .await
            .unwrap();
        assert_eq!(rec.titles(), vec!["Night Rest".to_string()]);
    }

    #[tokio::test]
    async fn vegan_interview_filters_gelatin_products() {
        let catalog = InMemoryCatalog::new(vec![
            json!({
                "title": {"en": "Sleep Softgels"},
                "description": {"en": "Deep sleep support in a gelatin softgel"},
                "healthGoals": ["Sleep"],
                "status": true,
            }),
            sleep_doc(),
        ]);
        let context = ctx(&[
            ("concern", json!(["sleep"])),
            ("eating_habits", json!("vegan")),
        ]);

        let rec = recommender()
            .recommend(&catalog, None, &context, &[], None)
            .await
            .unwrap();
        assert_eq!(rec.titles(), vec!["Night Rest".to_string()]);
    }
}
