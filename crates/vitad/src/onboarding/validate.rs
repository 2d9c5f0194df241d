//! Per-field answer validation and normalization.
//!
//! Every field has a deterministic normalizer: case-insensitive alias
//! lookup for enumerated fields, structural checks for free-text ones.
//! A failed normalization carries the user-facing error message; the
//! orchestrator re-asks the same field and the step cursor does not move.

use regex::Regex;
use serde_json::{json, Value};
use std::sync::OnceLock;

use super::fields::{Field, FixedField};
use crate::concerns::ConcernTaxonomy;

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap())
}

/// Normalize a raw answer for a field, or reject it with a user-facing
/// error message.
pub fn normalize_answer(
    field: Field,
    raw: &str,
    taxonomy: &ConcernTaxonomy,
) -> Result<Value, String> {
    let trimmed = raw.trim();
    let lowered = trimmed.to_lowercase();

    match field {
        Field::Fixed(FixedField::Name) => {
            if trimmed.chars().count() < 2 {
                Err("That name looks a bit short. Could you give me at least 2 characters?"
                    .to_string())
            } else {
                Ok(json!(trimmed))
            }
        }
        Field::Fixed(FixedField::FillingFor) => {
            match lowered.as_str() {
                "myself" | "me" | "for myself" | "self" => Ok(json!("myself")),
                "family member" | "family" | "a family member" | "someone else"
                | "for a family member" => Ok(json!("family_member")),
                _ => Err("Please choose 'myself' or 'family member'.".to_string()),
            }
        }
        Field::Fixed(FixedField::Relation) => {
            if trimmed.chars().count() < 2 {
                Err("Could you tell me who this is for, like 'my mother'?".to_string())
            } else {
                Ok(json!(trimmed))
            }
        }
        Field::Fixed(FixedField::Email) => {
            if email_re().is_match(trimmed) {
                Ok(json!(lowered))
            } else {
                Err("That doesn't look like a valid email address. \
                     Could you check it and try again?"
                    .to_string())
            }
        }
        Field::Fixed(FixedField::Gender) => match lowered.as_str() {
            "male" | "man" | "m" => Ok(json!("male")),
            "female" | "woman" | "f" => Ok(json!("female")),
            "neutral" | "non-binary" | "nonbinary" | "other" | "prefer not to say" => {
                Ok(json!("neutral"))
            }
            _ => Err("Please choose male, female, or neutral.".to_string()),
        },
        Field::Fixed(FixedField::Knowledge) => match lowered.as_str() {
            "beginner" | "not much" | "nothing" | "little" => Ok(json!("beginner")),
            "average" | "some" | "a bit" => Ok(json!("average")),
            "expert" | "a lot" | "plenty" => Ok(json!("expert")),
            _ => Err("Please choose beginner, average, or expert.".to_string()),
        },
        Field::Fixed(FixedField::VitaminCount) => match lowered.as_str() {
            "0" | "none" => Ok(json!("0")),
            "1-2" | "1" | "2" | "one" | "two" => Ok(json!("1-2")),
            "3-5" | "3" | "4" | "5" => Ok(json!("3-5")),
            "more than 5" | "5+" | "6" | "many" => Ok(json!("more than 5")),
            _ => Err("Please choose one of: 0, 1-2, 3-5, more than 5.".to_string()),
        },
        Field::Fixed(FixedField::Age) => match trimmed.parse::<u32>() {
            Ok(age) if (1..=100).contains(&age) => Ok(json!(age.to_string())),
            _ => Err("Please give me an age between 1 and 100.".to_string()),
        },
        Field::Fixed(FixedField::Conceive)
        | Field::Fixed(FixedField::Alcohol)
        | Field::Fixed(FixedField::MedicalTreatment) => yes_no(&lowered),
        Field::Fixed(FixedField::Situation) => match lowered.as_str() {
            "pregnant" => Ok(json!("pregnant")),
            "breastfeeding" | "nursing" => Ok(json!("breastfeeding")),
            "trying to conceive" | "trying" => Ok(json!("trying to conceive")),
            _ => Err("Please choose pregnant, breastfeeding, or trying to conceive."
                .to_string()),
        },
        Field::Fixed(FixedField::EatingHabits) => match lowered.as_str() {
            "omnivore" | "i eat everything" | "everything" | "meat eater" => Ok(json!("omnivore")),
            "vegetarian" | "veggie" => Ok(json!("vegetarian")),
            "vegan" | "plant-based" | "plant based" => Ok(json!("vegan")),
            "pescatarian" | "fish but no meat" => Ok(json!("pescatarian")),
            _ => Err("Please choose omnivore, vegetarian, vegan, or pescatarian.".to_string()),
        },
        Field::Fixed(FixedField::MeatIntake) | Field::Fixed(FixedField::FishIntake) => {
            match lowered.as_str() {
                "daily" | "every day" => Ok(json!("daily")),
                "a few times a week" | "weekly" | "few times a week" => {
                    Ok(json!("a few times a week"))
                }
                "rarely" | "sometimes" => Ok(json!("rarely")),
                "never" => Ok(json!("never")),
                _ => Err(
                    "Please choose daily, a few times a week, rarely, or never.".to_string()
                ),
            }
        }
        Field::Fixed(FixedField::AlcoholFrequency) => match lowered.as_str() {
            "daily" | "every day" => Ok(json!("daily")),
            "weekly" | "a few times a week" => Ok(json!("weekly")),
            "monthly" | "occasionally" | "rarely" => Ok(json!("monthly")),
            _ => Err("Please choose daily, weekly, or monthly.".to_string()),
        },
        Field::Fixed(FixedField::AlcoholAmount) => match lowered.as_str() {
            "1-2" | "1" | "2" | "one or two" => Ok(json!("1-2")),
            "3-5" | "3" | "4" | "5" => Ok(json!("3-5")),
            "more than 5" | "5+" | "6" | "a lot" => Ok(json!("more than 5")),
            _ => Err("Please choose 1-2, 3-5, or more than 5.".to_string()),
        },
        Field::Fixed(FixedField::Concern) => {
            let concerns = taxonomy.normalize(trimmed);
            if concerns.is_empty() {
                Err("I couldn't match that to anything I know. You can name things \
                     like sleep, stress, energy, stomach and intestines, skin, \
                     resistance, or hair and nails."
                    .to_string())
            } else {
                Ok(json!(concerns
                    .iter()
                    .map(|c| c.as_str())
                    .collect::<Vec<_>>()))
            }
        }
        Field::Fixed(FixedField::DietaryPreferences) => match lowered.as_str() {
            "no preference" | "no" | "none" => Ok(json!("no preference")),
            "lactose-free" | "lactose free" => Ok(json!("lactose-free")),
            "gluten-free" | "gluten free" => Ok(json!("gluten-free")),
            "paleo" => Ok(json!("paleo")),
            _ => Err(
                "Please choose no preference, lactose-free, gluten-free, or paleo.".to_string()
            ),
        },
        Field::Fixed(FixedField::Allergies) => {
            if lowered == "no" || lowered == "none" || lowered == "no allergies" {
                Ok(json!("no"))
            } else if trimmed.chars().count() < 2 {
                Err("Please answer 'no' or name your allergies.".to_string())
            } else {
                Ok(json!(lowered))
            }
        }
        Field::Fixed(FixedField::AyurvedaView) => {
            let options = field.spec().options;
            match options.iter().find(|o| **o == lowered) {
                Some(option) => Ok(json!(option)),
                None => match lowered.as_str() {
                    "enthusiastic" => Ok(json!("i am enthusiastic")),
                    "skeptical" => Ok(json!("i am skeptical")),
                    "nonsense" => Ok(json!("alternative medicine is nonsense")),
                    _ => Err("Please pick one of the listed options.".to_string()),
                },
            }
        }
        Field::ConcernFollowup { .. } => {
            let spec = field.spec();
            if spec.options.is_empty() {
                if trimmed.is_empty() {
                    Err("Could you tell me a bit more?".to_string())
                } else {
                    Ok(json!(trimmed))
                }
            } else {
                match spec.options.iter().find(|o| **o == lowered) {
                    Some(option) => Ok(json!(option)),
                    None => Err(format!(
                        "Please pick one of: {}.",
                        spec.options.join(", ")
                    )),
                }
            }
        }
    }
}

fn yes_no(lowered: &str) -> Result<Value, String> {
    match lowered {
        "yes" | "y" | "yeah" | "yep" | "sure" => Ok(json!("yes")),
        "no" | "n" | "nope" | "not really" => Ok(json!("no")),
        _ => Err("A simple yes or no works best here.".to_string()),
    }
}
