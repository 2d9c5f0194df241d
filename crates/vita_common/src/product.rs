//! Product catalog types.
//!
//! Candidate products arrive from the catalog collaborator as raw JSON
//! documents with multilingual title/description/nutrition maps. The engine
//! scores and filters the raw documents and only projects the typed
//! [`Product`] for accepted candidates.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPrice {
    pub currency: Option<String>,
    pub amount: Option<f64>,
    #[serde(rename = "taxRate")]
    pub tax_rate: Option<f64>,
}

impl ProductPrice {
    pub fn display(&self) -> String {
        match (&self.amount, &self.currency) {
            (Some(amount), Some(currency)) => format!("{} {}", amount, currency),
            _ => "price unavailable".to_string(),
        }
    }
}

/// Typed projection of a catalog product document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "shortDescription")]
    pub short_description: Option<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default, rename = "healthGoals")]
    pub health_goals: Vec<String>,
    #[serde(default, rename = "nutritionInfo")]
    pub nutrition_info: Option<String>,
    #[serde(default, rename = "howToUse")]
    pub how_to_use: Option<String>,
    #[serde(default)]
    pub price: Option<ProductPrice>,
}

impl Product {
    /// Detailed one-line snippet used as LLM context for free-form chat.
    pub fn to_prompt_snippet(&self) -> String {
        let mut parts = vec![format!("**{}**", self.title)];

        if let Some(desc) = self.short_description.as_deref().or_else(|| {
            self.description.as_deref()
        }) {
            parts.push(format!("Description: {}", truncate(desc, 150)));
        }

        if !self.health_goals.is_empty() {
            parts.push(format!("Health Goals: {}", self.health_goals.join(", ")));
        }

        if !self.benefits.is_empty() {
            let top: Vec<&str> = self.benefits.iter().take(4).map(String::as_str).collect();
            parts.push(format!("Key Benefits: {}", top.join("; ")));
        }

        if let Some(price) = &self.price {
            parts.push(format!("Price: {}", price.display()));
        }

        if let Some(how) = &self.how_to_use {
            parts.push(format!("How to Use: {}", how));
        }

        parts.join(" | ")
    }
}

/// Truncate on a char boundary, appending an ellipsis when shortened.
fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let cut = text
        .char_indices()
        .take_while(|(i, _)| *i <= max)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(0);
    format!("{}...", &text[..cut])
}

/// Resolve a possibly multilingual field (`{"en": ..., "nl": ...}` or plain
/// string) to a single string, preferring English.
pub fn localized_str(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(map) => map
            .get("en")
            .or_else(|| map.values().next())
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

/// Items of a JSON array field rendered as strings.
pub fn string_items(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Best-effort title of a raw catalog document.
pub fn doc_title(doc: &Value) -> String {
    localized_str(doc.get("title")).unwrap_or_else(|| "Unknown Product".to_string())
}

/// Whether a catalog document is active and not soft-deleted.
///
/// The catalog stores `status` either as a boolean or as the literal string
/// `"Active"`; anything else is treated as inactive.
pub fn doc_is_active(doc: &Value) -> bool {
    let active = match doc.get("status") {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "Active",
        _ => false,
    };
    active && doc.get("isDeleted").and_then(Value::as_bool) != Some(true)
}

/// Searchable text of a document: title, descriptions, benefits, health
/// goals and ingredients, joined with spaces. Used by scoring.
pub fn doc_search_text(doc: &Value) -> String {
    let mut parts = Vec::new();
    if let Some(title) = localized_str(doc.get("title")) {
        parts.push(title);
    }
    if let Some(description) = localized_str(doc.get("description")) {
        parts.push(description);
    }
    if let Some(short) = localized_str(doc.get("shortDescription")) {
        parts.push(short);
    }
    parts.extend(string_items(doc.get("benefits")));
    parts.extend(string_items(doc.get("healthGoals")));
    parts.extend(string_items(doc.get("ingredients")));
    parts.join(" ")
}

/// Extended text used for allergen and dietary scanning: everything in
/// [`doc_search_text`] plus nutrition info and certifications.
pub fn doc_allergen_text(doc: &Value) -> String {
    let mut parts = vec![doc_search_text(doc)];
    if let Some(nutrition) = localized_str(doc.get("nutritionInfo")) {
        parts.push(nutrition);
    }
    parts.extend(doc_certifications(doc));
    parts.join(" ")
}

/// Certification labels from `sourceInfo.certification`.
pub fn doc_certifications(doc: &Value) -> Vec<String> {
    string_items(doc.get("sourceInfo").and_then(|s| s.get("certification")))
}

/// Project a raw catalog document into the typed [`Product`].
pub fn doc_to_product(doc: &Value) -> Product {
    let title = doc_title(doc);
    let description = localized_str(doc.get("description"));
    let short_description = localized_str(doc.get("shortDescription"))
        .or_else(|| description.as_deref().map(|d| truncate(d, 150)));
    let slug = doc.get("slug").and_then(Value::as_str).map(str::to_string);
    let id = doc
        .get("_id")
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .or_else(|| slug.clone())
        .unwrap_or_else(|| title.to_lowercase().replace([' ', '-'], "_"));

    let price = doc.get("price").and_then(|p| {
        p.as_object().map(|obj| ProductPrice {
            currency: obj.get("currency").and_then(Value::as_str).map(str::to_string),
            amount: obj.get("amount").and_then(Value::as_f64),
            tax_rate: obj.get("taxRate").and_then(Value::as_f64),
        })
    });

    Product {
        id,
        title,
        slug,
        description,
        short_description,
        benefits: string_items(doc.get("benefits")),
        health_goals: string_items(doc.get("healthGoals")),
        nutrition_info: localized_str(doc.get("nutritionInfo")),
        how_to_use: localized_str(doc.get("howToUse")),
        price,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn localized_prefers_english() {
        let doc = json!({"title": {"nl": "Slaap", "en": "Sleep Support"}});
        assert_eq!(doc_title(&doc), "Sleep Support");
    }

    #[test]
    fn plain_string_title_accepted() {
        let doc = json!({"title": "Magnesium"});
        assert_eq!(doc_title(&doc), "Magnesium");
    }

    #[test]
    fn status_string_and_bool_both_count_as_active() {
        assert!(doc_is_active(&json!({"status": true})));
        assert!(doc_is_active(&json!({"status": "Active"})));
        assert!(!doc_is_active(&json!({"status": false})));
        assert!(!doc_is_active(&json!({"status": "Draft"})));
        assert!(!doc_is_active(&json!({"status": true, "isDeleted": true})));
    }

    #[test]
    fn allergen_text_includes_nutrition_and_certifications() {
        let doc = json!({
            "title": "Omega",
            "status": true,
            "nutritionInfo": {"en": "contains fish oil"},
            "sourceInfo": {"certification": ["MSC certified"]}
        });
        let text = doc_allergen_text(&doc);
        assert!(text.contains("fish oil"));
        assert!(text.contains("MSC certified"));
    }
}
