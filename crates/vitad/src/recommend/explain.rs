//! Recommendation message assembly.
//!
//! The message is built without the LLM so a completed interview always
//! gets a useful reply. Phrasing varies per product through a template
//! picked by hashing the title, which keeps output stable for the same
//! product across runs.

use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use vita_common::Product;

use super::{safety, Recommendation};
use crate::concerns::ConcernKey;

/// Extra notices woven into the summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct EscalationNotes {
    /// A returning user reported the same concern as last time without
    /// improvement.
    pub previous_concern_unresolved: bool,
}

/// Build the full recommendation reply from the interview answers and
/// the recommendation result.
pub fn build_message(
    recommendation: &Recommendation,
    context: &BTreeMap<String, Value>,
    notes: EscalationNotes,
) -> String {
    let concerns = concern_list(context);
    let mut paragraphs = vec![summary(&concerns, context, notes)];

    if recommendation.is_empty() {
        paragraphs.push(
            "I couldn't find a product I'm confident enough to recommend for this. \
             I'd rather tell you that than suggest something that doesn't fit."
                .to_string(),
        );
        return paragraphs.join("\n\n");
    }

    for product in &recommendation.products {
        let mut block = product_block(product, &concerns);
        if let Some(warnings) = recommendation.warnings.get(&product.title) {
            for warning in warnings {
                block.push_str("\nNote: ");
                block.push_str(warning);
            }
        }
        paragraphs.push(block);
    }

    paragraphs.join("\n\n")
}

fn concern_list(context: &BTreeMap<String, Value>) -> Vec<ConcernKey> {
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

fn join_labels(concerns: &[ConcernKey]) -> String {
    let labels: Vec<String> = concerns
        .iter()
        .map(|c| c.label().to_lowercase())
        .collect();
    match labels.len() {
        0 => "your goals".to_string(),
        1 => labels[0].clone(),
        _ => {
            let (last, rest) = labels.split_last().expect("non-empty");
            format!("{} and {}", rest.join(", "), last)
        }
    }
}

fn summary(
    concerns: &[ConcernKey],
    context: &BTreeMap<String, Value>,
    notes: EscalationNotes,
) -> String {
    let mut sentences = vec![format!(
        "Thanks for walking me through everything. Based on your answers, \
         the main thing to work on is {}.",
        join_labels(concerns)
    )];

    if notes.previous_concern_unresolved {
        if let Some(concern) = concerns.first() {
            sentences.push(format!(
                "Since {} hasn't improved since we last spoke, it would also be \
                 sensible to discuss it with your doctor.",
                concern.label().to_lowercase()
            ));
        }
    }

    if safety::should_exclude_ayurveda(context) {
        sentences.push(
            "I've left traditional herbal formulas out, given how you feel about them."
                .to_string(),
        );
    }

    sentences.join(" ")
}

fn product_block(product: &Product, concerns: &[ConcernKey]) -> String {
    let benefits = top_benefits(product, concerns);
    let concern_text = join_labels(concerns);

    let mut hasher = DefaultHasher::new();
    product.title.hash(&mut hasher);
    let mut block = match hasher.finish() % 3 {
        0 => format!(
            "**{}** could help with {}: {}.",
            product.title, concern_text, benefits
        ),
        1 => format!(
            "For {}, **{}** stands out. It offers {}.",
            concern_text, product.title, benefits
        ),
        _ => format!(
            "I'd suggest **{}** here; it supports {}.",
            product.title, benefits
        ),
    };

    if let Some(price) = &product.price {
        block.push_str(&format!(" It costs {}.", price.display()));
    }
    block
}

/// The one or two benefits most related to the selected concerns, with
/// the first listed benefits as fallback.
fn top_benefits(product: &Product, concerns: &[ConcernKey]) -> String {
    let keyword_match = |benefit: &String| {
        let lowered = benefit.to_lowercase();
        concerns
            .iter()
            .flat_map(|c| c.keywords().iter())
            .any(|k| lowered.contains(k))
    };

    let mut picked: Vec<&String> = product
        .benefits
        .iter()
        .filter(|b| keyword_match(b))
        .take(2)
        .collect();
    if picked.is_empty() {
        picked = product.benefits.iter().take(2).collect();
    }

    if picked.is_empty() {
        return "overall support for this goal".to_string();
    }
    picked
        .iter()
        .map(|b| b.to_lowercase())
        .collect::<Vec<_>>()
        .join(" and ")
}
