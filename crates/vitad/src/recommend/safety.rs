//! Suitability filters and safety warning detection.
//!
//! Filters answer "may this product be recommended at all" given the
//! interview answers; warnings annotate products that pass the filters
//! but deserve a caution (pregnancy, allergens, age, ongoing medical
//! treatment).

use serde_json::Value;
use std::collections::BTreeMap;

use vita_common::{doc_allergen_text, doc_certifications, doc_search_text};

fn answer<'a>(context: &'a BTreeMap<String, Value>, key: &str) -> Option<&'a str> {
    context.get(key).and_then(Value::as_str)
}

/// Ayurveda products are withheld from users who expressed a negative
/// or undecided view.
pub fn should_exclude_ayurveda(context: &BTreeMap<String, Value>) -> bool {
    matches!(
        answer(context, "ayurveda_view"),
        Some("more information needed for an opinion")
            | Some("i am skeptical")
            | Some("alternative medicine is nonsense")
    )
}

const AYURVEDA_KEYWORDS: &[&str] = &[
    "ayurveda",
    "ayurvedic",
    "ayurved",
    "traditional indian medicine",
    "ancient indian medicine",
];

const AYURVEDIC_HERBS: &[&str] = &[
    "ashwagandha",
    "withania somnifera",
    "turmeric",
    "curcumin",
    "holy basil",
    "tulsi",
    "ocimum sanctum",
    "triphala",
    "amla",
    "amalaki",
    "brahmi",
    "bacopa monnieri",
    "guggul",
    "commiphora mukul",
    "shilajit",
    "guduchi",
    "tinospora cordifolia",
    "neem",
    "azadirachta indica",
    "ginger",
    "zingiber officinale",
    "licorice",
    "glycyrrhiza glabra",
    "gotu kola",
    "centella asiatica",
    "boswellia",
    "frankincense",
];

/// Whether a product is Ayurveda-related, by generic terms or by the
/// classical herbs in its text.
pub fn is_ayurveda_product(doc: &Value) -> bool {
    let text = doc_search_text(doc).to_lowercase();
    AYURVEDA_KEYWORDS.iter().any(|k| text.contains(k))
        || AYURVEDIC_HERBS.iter().any(|h| text.contains(h))
}

const ANIMAL_INDICATORS: &[&str] =
    &["gelatin", "fish", "shellfish", "milk", "dairy", "whey", "casein"];

/// Hard suitability check: dietary pattern, allergies, preferences.
pub fn is_safe_and_suitable(doc: &Value, context: &BTreeMap<String, Value>) -> bool {
    if context.is_empty() {
        return true;
    }

    if answer(context, "eating_habits") == Some("vegan") {
        let text = doc_search_text(doc).to_lowercase();
        if ANIMAL_INDICATORS.iter().any(|a| text.contains(a)) {
            // An explicit vegan certification overrides the text match.
            let certs = doc_certifications(doc).join(" ").to_lowercase();
            if !certs.contains("vegan") {
                return false;
            }
        }
    }

    if let Some(allergies) = answer(context, "allergies") {
        if !allergies.is_empty() && allergies != "no" && contains_allergens(doc, allergies) {
            return false;
        }
    }

    if let Some(prefs) = answer(context, "dietary_preferences") {
        if !prefs.is_empty()
            && prefs != "no preference"
            && !matches_dietary_preferences(doc, prefs)
        {
            return false;
        }
    }

    true
}

fn allergen_synonyms(allergy: &str) -> &'static [&'static str] {
    match allergy {
        "milk" => &["milk", "lactose", "dairy", "casein", "whey", "butter", "cream"],
        "egg" => &["egg", "albumin", "ovalbumin", "lecithin", "eggs"],
        "fish" => &[
            "fish", "gelatin", "fish oil", "omega-3", "dha", "epa", "cod", "salmon", "tuna",
        ],
        "shellfish" | "crustaceans" => {
            &["shellfish", "crustacean", "shrimp", "crab", "lobster", "prawn"]
        }
        "peanut" => &["peanut", "peanuts", "arachis"],
        "nuts" => &[
            "nut",
            "almond",
            "walnut",
            "hazelnut",
            "cashew",
            "pistachio",
            "pecan",
            "macadamia",
            "brazil nut",
        ],
        "soy" => &["soy", "soya", "soybean", "soy bean", "tofu", "tempeh", "miso"],
        "gluten" => &["gluten", "wheat", "barley", "rye", "triticale", "spelt", "kamut"],
        "wheat" => &["wheat", "gluten", "flour", "semolina", "durum"],
        "pollen" => &["pollen", "bee pollen", "flower pollen"],
        _ => &[],
    }
}

/// Whether the product text mentions any of the user's stated
/// allergens, expanded through the synonym table.
pub fn contains_allergens(doc: &Value, user_allergies: &str) -> bool {
    // "shellfish and crustaceans" is a single phrase users type often
    let normalized = user_allergies
        .to_lowercase()
        .replace("shellfish and crustaceans", "shellfish,crustaceans");
    let text = doc_allergen_text(doc).to_lowercase();

    for allergy in normalized.split(',').map(str::trim) {
        if allergy.is_empty() || allergy == "no" {
            continue;
        }
        let synonyms = allergen_synonyms(allergy);
        if synonyms.is_empty() {
            if text.contains(allergy) {
                return true;
            }
        } else if synonyms.iter().any(|s| text.contains(s)) {
            return true;
        }
    }
    false
}

/// Whether the product is compatible with a dietary preference.
pub fn matches_dietary_preferences(doc: &Value, prefs: &str) -> bool {
    let text = doc_allergen_text(doc).to_lowercase();
    let certs: Vec<String> = doc_certifications(doc)
        .iter()
        .map(|c| c.to_lowercase())
        .collect();

    if prefs.contains("lactose-free") || prefs.contains("lactose free") {
        let lactose = ["lactose", "dairy", "milk", "whey", "casein", "butter", "cream"];
        if lactose.iter().any(|i| text.contains(i)) {
            return false;
        }
    }

    if prefs.contains("gluten-free") || prefs.contains("gluten free") {
        if certs.iter().any(|c| c == "gluten-free" || c == "gluten free") {
            return true;
        }
        let gluten = ["gluten", "wheat", "barley", "rye"];
        if gluten.iter().any(|i| text.contains(i)) {
            return false;
        }
    }

    if prefs.contains("paleo") {
        let avoid = [
            "wheat", "barley", "rye", "rice", "soy", "soya", "bean", "peanut", "dairy", "milk",
            "lactose",
        ];
        if avoid.iter().any(|i| text.contains(i)) {
            return false;
        }
    }

    true
}

const PREGNANCY_RISKY_HERBS: &[(&str, &str)] = &[
    ("black cohosh", "may affect hormone levels"),
    ("dong quai", "may cause uterine contractions"),
    ("goldenseal", "may cause uterine contractions"),
    ("blue cohosh", "may cause uterine contractions"),
    ("pennyroyal", "may cause miscarriage"),
    ("saw palmetto", "may affect hormone levels"),
    ("yohimbe", "may affect blood pressure"),
    ("ephedra", "may affect blood pressure and heart rate"),
];

/// Generate the safety warnings relevant to this user for a product
/// that already passed the suitability filters.
pub fn warnings(doc: &Value, context: &BTreeMap<String, Value>) -> Vec<String> {
    let mut out = Vec::new();
    let text = doc_allergen_text(doc).to_lowercase();

    let gender = answer(context, "gender");
    let situation = answer(context, "situation").unwrap_or("");
    let is_pregnant =
        answer(context, "conceive") == Some("yes") || situation.contains("pregnant");
    let is_breastfeeding = situation.contains("breastfeeding");

    if gender != Some("male") && (is_pregnant || is_breastfeeding) {
        out.extend(pregnancy_concerns(&text));
    }

    if let Some(allergies) = answer(context, "allergies") {
        if !allergies.is_empty() && allergies != "no" {
            let detected = detect_allergens(&text, allergies);
            if !detected.is_empty() {
                out.push(format!(
                    "This product may contain {}. Please check the ingredient list and \
                     consult with your healthcare provider if you have allergies.",
                    detected.join(", ")
                ));
            }
        }
    }

    let age = answer(context, "age").and_then(|a| a.parse::<u32>().ok());
    if age.is_some_and(|a| a < 18) {
        out.extend(age_concerns(&text));
    }

    if answer(context, "medical_treatment") == Some("yes") {
        out.push(
            "Please consult with your healthcare provider before starting any new \
             supplements, especially if you're currently undergoing medical treatment."
                .to_string(),
        );
    }

    out
}

fn pregnancy_concerns(text: &str) -> Vec<String> {
    let mut out = Vec::new();

    let retinol_terms = ["retinol", "vitamin a", "retinyl"];
    if retinol_terms.iter().any(|t| text.contains(t)) && !text.contains("beta-carotene") {
        out.push(
            "This product contains Vitamin A (retinol). High doses of Vitamin A can be \
             harmful during pregnancy. Please consult your healthcare provider before use."
                .to_string(),
        );
    }

    for (herb, reason) in PREGNANCY_RISKY_HERBS {
        if text.contains(herb) {
            out.push(format!(
                "This product contains {herb}, which {reason} during pregnancy. \
                 Please consult your healthcare provider before use."
            ));
        }
    }

    if (text.contains("high dose") || text.contains("megadose"))
        && ["iron", "zinc", "selenium"].iter().any(|m| text.contains(m))
    {
        out.push(
            "This product contains high doses of minerals. Please consult your \
             healthcare provider to ensure the dosage is appropriate during pregnancy \
             or breastfeeding."
                .to_string(),
        );
    }

    out
}

fn detect_allergens(text: &str, user_allergies: &str) -> Vec<&'static str> {
    const INDICATORS: &[(&str, &[&str])] = &[
        ("milk", &["milk", "lactose", "casein", "whey", "dairy"]),
        ("egg", &["egg", "albumin", "lecithin", "ovalbumin"]),
        ("fish", &["fish", "fish oil", "omega-3", "dha", "epa", "cod liver"]),
        ("shellfish", &["shellfish", "shrimp", "crab", "lobster", "crustacean"]),
        ("peanut", &["peanut", "arachis"]),
        (
            "tree nuts",
            &["almond", "walnut", "hazelnut", "cashew", "pistachio", "pecan", "macadamia"],
        ),
        ("soy", &["soy", "soya", "soybean", "tofu"]),
        ("gluten", &["wheat", "barley", "rye", "gluten"]),
    ];

    let allergies = user_allergies.to_lowercase();
    INDICATORS
        .iter()
        .filter(|(name, indicators)| {
            allergies.contains(name) && indicators.iter().any(|i| text.contains(i))
        })
        .map(|(name, _)| *name)
        .collect()
}

fn age_concerns(text: &str) -> Vec<String> {
    let mut out = Vec::new();

    let high_dose = ["high dose", "megadose", "exceeds", "above recommended"];
    if high_dose.iter().any(|t| text.contains(t)) {
        out.push(
            "This product contains high doses that may not be suitable for individuals \
             under 18. Please consult a healthcare provider before use."
                .to_string(),
        );
    }

    let stimulants = ["caffeine", "guarana", "yerba mate", "green tea extract"];
    if stimulants.iter().any(|t| text.contains(t)) {
        out.push(
            "This product contains stimulants. Use caution if you are under 18, and \
             consult a healthcare provider."
                .to_string(),
        );
    }

    let weight_loss = ["weight loss", "fat burner", "metabolism booster"];
    if weight_loss.iter().any(|t| text.contains(t)) {
        out.push(
            "Weight management supplements are generally not recommended for \
             individuals under 18. Please consult a healthcare provider."
                .to_string(),
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn skeptical_view_excludes_ayurveda() {
        let context = ctx(&[("ayurveda_view", json!("i am skeptical"))]);
        assert!(should_exclude_ayurveda(&context));
        let context = ctx(&[("ayurveda_view", json!("open to trying"))]);
        assert!(!should_exclude_ayurveda(&context));
    }

    #[test]
    fn ashwagandha_counts_as_ayurveda() {
        let doc = json!({
            "title": {"en": "Calm Complex"},
            "ingredients": ["Ashwagandha root extract", "Magnesium"],
        });
        assert!(is_ayurveda_product(&doc));
    }

    #[test]
    fn vegan_blocks_gelatin_without_certification() {
        let doc = json!({
            "title": {"en": "Omega Caps"},
            "description": {"en": "Softgel capsules with gelatin shell"},
        });
        let context = ctx(&[("eating_habits", json!("vegan"))]);
        assert!(!is_safe_and_suitable(&doc, &context));

        let certified = json!({
            "title": {"en": "Omega Caps V"},
            "description": {"en": "Plant softgel, gelatin-free alternative to gelatin caps"},
            "sourceInfo": {"certification": ["Vegan"]},
        });
        assert!(is_safe_and_suitable(&certified, &context));
    }

    #[test]
    fn shellfish_allergy_matches_both_phrasings() {
        let doc = json!({
            "title": {"en": "Marine Collagen"},
            "ingredients": ["Hydrolyzed collagen from shrimp shells"],
        });
        assert!(contains_allergens(&doc, "shellfish and crustaceans"));
        assert!(contains_allergens(&doc, "crustaceans"));
        assert!(!contains_allergens(&doc, "soy"));
    }

    #[test]
    fn gluten_free_certification_overrides_text() {
        let doc = json!({
            "title": {"en": "Oat Beta Glucan"},
            "description": {"en": "May contain traces of wheat"},
            "sourceInfo": {"certification": ["Gluten-Free"]},
        });
        assert!(matches_dietary_preferences(&doc, "gluten-free"));
    }

    #[test]
    fn pregnancy_warning_for_retinol() {
        let doc = json!({
            "title": {"en": "Skin Renew"},
            "ingredients": ["Retinol", "Vitamin E"],
        });
        let context = ctx(&[
            ("gender", json!("female")),
            ("conceive", json!("yes")),
            ("allergies", json!("no")),
        ]);
        let warnings = warnings(&doc, &context);
        assert!(warnings.iter().any(|w| w.contains("Vitamin A")));
    }

    #[test]
    fn medical_treatment_always_warns() {
        let doc = json!({"title": {"en": "Basic Multi"}});
        let context = ctx(&[("medical_treatment", json!("yes"))]);
        let warnings = warnings(&doc, &context);
        assert!(warnings.iter().any(|w| w.contains("medical treatment")));
    }
}
