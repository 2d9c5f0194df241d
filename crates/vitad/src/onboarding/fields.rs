//! Interview fields and the dynamic step-list computation.
//!
//! There is no fixed schema: the ordered step list is rebuilt from scratch
//! after every answer as a pure function of the responses given so far.
//! Branch handling is exhaustive over the [`Field`] sum type; the string
//! key form (`concern|<concern>|<questionId>`) is only a storage encoding.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::concerns::{ConcernKey, ConcernTaxonomy};

/// Main-sequence fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixedField {
    Name,
    FillingFor,
    Relation,
    Email,
    Gender,
    Knowledge,
    VitaminCount,
    Age,
    Conceive,
    Situation,
    EatingHabits,
    MeatIntake,
    FishIntake,
    Alcohol,
    AlcoholFrequency,
    AlcoholAmount,
    Concern,
    DietaryPreferences,
    Allergies,
    AyurvedaView,
    MedicalTreatment,
}

impl FixedField {
    pub fn key(&self) -> &'static str {
        match self {
            FixedField::Name => "name",
            FixedField::FillingFor => "filling_for",
            FixedField::Relation => "relation",
            FixedField::Email => "email",
            FixedField::Gender => "gender",
            FixedField::Knowledge => "knowledge",
            FixedField::VitaminCount => "vitamin_count",
            FixedField::Age => "age",
            FixedField::Conceive => "conceive",
            FixedField::Situation => "situation",
            FixedField::EatingHabits => "eating_habits",
            FixedField::MeatIntake => "meat_intake",
            FixedField::FishIntake => "fish_intake",
            FixedField::Alcohol => "alcohol",
            FixedField::AlcoholFrequency => "alcohol_frequency",
            FixedField::AlcoholAmount => "alcohol_amount",
            FixedField::Concern => "concern",
            FixedField::DietaryPreferences => "dietary_preferences",
            FixedField::Allergies => "allergies",
            FixedField::AyurvedaView => "ayurveda_view",
            FixedField::MedicalTreatment => "medical_treatment",
        }
    }
}

/// One interview question: a main-sequence field or a concern follow-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Fixed(FixedField),
    ConcernFollowup {
        concern: ConcernKey,
        question: &'static str,
    },
}

impl Field {
    /// Storage key in the responses map.
    pub fn storage_key(&self) -> String {
        match self {
            Field::Fixed(field) => field.key().to_string(),
            Field::ConcernFollowup { concern, question } => {
                format!("concern|{}|{}", concern, question)
            }
        }
    }
}

/// What kind of input the current question expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    YesNo,
    Options,
    Text,
    Number,
}

/// One selectable choice offered with a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub value: String,
    pub label: String,
}

impl QuestionOption {
    pub(crate) fn from_value(value: &str) -> Self {
        let mut label = String::with_capacity(value.len());
        let mut start_of_word = true;
        for c in value.chars() {
            if start_of_word {
                label.extend(c.to_uppercase());
            } else {
                label.push(c);
            }
            start_of_word = c == ' ' || c == '-';
        }
        Self {
            value: value.to_string(),
            label,
        }
    }
}

const YES_NO: &[&str] = &["yes", "no"];

/// Prompt template, input kind, and option set of a field.
pub struct FieldSpec {
    pub prompt: &'static str,
    pub question_type: QuestionType,
    pub options: &'static [&'static str],
}

impl Field {
    pub fn spec(&self) -> FieldSpec {
        match self {
            Field::Fixed(FixedField::Name) => FieldSpec {
                prompt: "Hey! I'm Vita, your supplement guide. What should I call you?",
                question_type: QuestionType::Text,
                options: &[],
            },
            Field::Fixed(FixedField::FillingFor) => FieldSpec {
                prompt: "Are you filling this in for yourself or for a family member?",
                question_type: QuestionType::Options,
                options: &["myself", "family member"],
            },
            Field::Fixed(FixedField::Relation) => FieldSpec {
                prompt: "Who are you filling this in for? For example: my mother, my son.",
                question_type: QuestionType::Text,
                options: &[],
            },
            Field::Fixed(FixedField::Email) => FieldSpec {
                prompt: "What email address can we reach you on?",
                question_type: QuestionType::Text,
                options: &[],
            },
            Field::Fixed(FixedField::Gender) => FieldSpec {
                prompt: "Which gender do you identify with?",
                question_type: QuestionType::Options,
                options: &["male", "female", "neutral"],
            },
            Field::Fixed(FixedField::Knowledge) => FieldSpec {
                prompt: "How much do you already know about vitamins and supplements?",
                question_type: QuestionType::Options,
                options: &["beginner", "average", "expert"],
            },
            Field::Fixed(FixedField::VitaminCount) => FieldSpec {
                prompt: "How many different vitamins or supplements do you take right now?",
                question_type: QuestionType::Options,
                options: &["0", "1-2", "3-5", "more than 5"],
            },
            Field::Fixed(FixedField::Age) => FieldSpec {
                prompt: "How old are you?",
                question_type: QuestionType::Number,
                options: &[],
            },
            Field::Fixed(FixedField::Conceive) => FieldSpec {
                prompt: "Are you pregnant, or trying to conceive?",
                question_type: QuestionType::YesNo,
                options: YES_NO,
            },
            Field::Fixed(FixedField::Situation) => FieldSpec {
                prompt: "Which situation applies to you right now?",
                question_type: QuestionType::Options,
                options: &["pregnant", "breastfeeding", "trying to conceive"],
            },
            Field::Fixed(FixedField::EatingHabits) => FieldSpec {
                prompt: "How would you describe your eating habits?",
                question_type: QuestionType::Options,
                options: &["omnivore", "vegetarian", "vegan", "pescatarian"],
            },
            Field::Fixed(FixedField::MeatIntake) => FieldSpec {
                prompt: "How often do you eat meat?",
                question_type: QuestionType::Options,
                options: &["daily", "a few times a week", "rarely", "never"],
            },
            Field::Fixed(FixedField::FishIntake) => FieldSpec {
                prompt: "How often do you eat fish?",
                question_type: QuestionType::Options,
                options: &["daily", "a few times a week", "rarely", "never"],
            },
            Field::Fixed(FixedField::Alcohol) => FieldSpec {
                prompt: "Do you drink alcohol?",
                question_type: QuestionType::YesNo,
                options: YES_NO,
            },
            Field::Fixed(FixedField::AlcoholFrequency) => FieldSpec {
                prompt: "How often do you drink alcohol?",
                question_type: QuestionType::Options,
                options: &["daily", "weekly", "monthly"],
            },
            Field::Fixed(FixedField::AlcoholAmount) => FieldSpec {
                prompt: "How many glasses do you usually have?",
                question_type: QuestionType::Options,
                options: &["1-2", "3-5", "more than 5"],
            },
            Field::Fixed(FixedField::Concern) => FieldSpec {
                prompt: "What would you like to work on? You can name several things, \
                         like sleep, stress, energy, stomach and intestines, skin, \
                         resistance, or hair and nails.",
                question_type: QuestionType::Text,
                options: &[],
            },
            Field::Fixed(FixedField::DietaryPreferences) => FieldSpec {
                prompt: "Do you have any dietary preferences or intolerances?",
                question_type: QuestionType::Options,
                options: &["no preference", "lactose-free", "gluten-free", "paleo"],
            },
            Field::Fixed(FixedField::Allergies) => FieldSpec {
                prompt: "Do you have any allergies? You can answer 'no' or name them, \
                         for example: shellfish and crustaceans, nuts, soy.",
                question_type: QuestionType::Text,
                options: &[],
            },
            Field::Fixed(FixedField::AyurvedaView) => FieldSpec {
                prompt: "How do you feel about traditional herbal medicine such as Ayurveda?",
                question_type: QuestionType::Options,
                options: &[
                    "i am enthusiastic",
                    "open to trying",
                    "more information needed for an opinion",
                    "i am skeptical",
                    "alternative medicine is nonsense",
                ],
            },
            Field::Fixed(FixedField::MedicalTreatment) => FieldSpec {
                prompt: "One last thing: are you currently under medical treatment or \
                         taking prescription medication?",
                question_type: QuestionType::YesNo,
                options: YES_NO,
            },
            Field::ConcernFollowup { concern, question } => {
                let followup = crate::concerns::followups(*concern)
                    .iter()
                    .find(|f| f.id == *question)
                    .copied();
                match followup {
                    Some(f) if f.options.is_empty() => FieldSpec {
                        prompt: f.prompt,
                        question_type: QuestionType::Text,
                        options: &[],
                    },
                    Some(f) => FieldSpec {
                        prompt: f.prompt,
                        question_type: if f.options == YES_NO {
                            QuestionType::YesNo
                        } else {
                            QuestionType::Options
                        },
                        options: f.options,
                    },
                    None => FieldSpec {
                        prompt: "Could you tell me a bit more about that?",
                        question_type: QuestionType::Text,
                        options: &[],
                    },
                }
            }
        }
    }

    pub fn question_options(&self) -> Option<Vec<QuestionOption>> {
        let spec = self.spec();
        if spec.options.is_empty() {
            None
        } else {
            Some(spec.options.iter().map(|o| QuestionOption::from_value(o)).collect())
        }
    }
}

/// Rebuild the ordered step list from the responses given so far.
///
/// Pure and deterministic: the same responses always produce the same
/// list. Returning users skip the stable identity fields but are always
/// re-asked their age.
pub fn compute_steps(
    taxonomy: &ConcernTaxonomy,
    responses: &BTreeMap<String, Value>,
    returning_user: bool,
) -> Vec<Field> {
    let answer = |key: &str| responses.get(key).and_then(Value::as_str);

    let mut steps = Vec::new();

    if !returning_user {
        steps.push(Field::Fixed(FixedField::Name));
    }
    steps.push(Field::Fixed(FixedField::FillingFor));
    if answer("filling_for") == Some("family_member") {
        steps.push(Field::Fixed(FixedField::Relation));
    }
    if !returning_user {
        steps.push(Field::Fixed(FixedField::Email));
        steps.push(Field::Fixed(FixedField::Gender));
        steps.push(Field::Fixed(FixedField::Knowledge));
        steps.push(Field::Fixed(FixedField::VitaminCount));
    }
    steps.push(Field::Fixed(FixedField::Age));

    let gender = answer("gender");
    if matches!(gender, Some("female") | Some("neutral")) {
        steps.push(Field::Fixed(FixedField::Conceive));
        if answer("conceive") == Some("yes") {
            steps.push(Field::Fixed(FixedField::Situation));
        }
    }

    steps.push(Field::Fixed(FixedField::EatingHabits));
    let eating = answer("eating_habits");
    let skips_meat = matches!(eating, Some("vegetarian") | Some("vegan"));
    if !skips_meat {
        steps.push(Field::Fixed(FixedField::MeatIntake));
        steps.push(Field::Fixed(FixedField::FishIntake));
    }

    steps.push(Field::Fixed(FixedField::Alcohol));
    if answer("alcohol") == Some("yes") {
        steps.push(Field::Fixed(FixedField::AlcoholFrequency));
        steps.push(Field::Fixed(FixedField::AlcoholAmount));
    }

    steps.push(Field::Fixed(FixedField::Concern));
    if let Some(concerns) = responses.get("concern").and_then(Value::as_array) {
        for key in concerns.iter().filter_map(Value::as_str) {
            if let Ok(concern) = key.parse::<ConcernKey>() {
                for followup in taxonomy.followups(concern) {
                    steps.push(Field::ConcernFollowup {
                        concern,
                        question: followup.id,
                    });
                }
            }
        }
    }

    steps.push(Field::Fixed(FixedField::DietaryPreferences));
    steps.push(Field::Fixed(FixedField::Allergies));
    steps.push(Field::Fixed(FixedField::AyurvedaView));
    steps.push(Field::Fixed(FixedField::MedicalTreatment));

    steps
}

/// Index of the first field in the step list without a stored response.
/// Answers are never removed, so this index can only grow across turns.
pub fn first_unanswered(steps: &[Field], responses: &BTreeMap<String, Value>) -> usize {
    steps
        .iter()
        .position(|field| !responses.contains_key(&field.storage_key()))
        .unwrap_or(steps.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn step_list_is_deterministic() {
        let taxonomy = ConcernTaxonomy::standard();
        let mut responses = BTreeMap::new();
        responses.insert("gender".to_string(), json!("female"));
        responses.insert("concern".to_string(), json!(["sleep"]));

        let first = compute_steps(&taxonomy, &responses, false);
        let second = compute_steps(&taxonomy, &responses, false);
        assert_eq!(first, second);
    }

    #[test]
    fn vegan_removes_meat_and_fish() {
        let taxonomy = ConcernTaxonomy::standard();
        let mut responses = BTreeMap::new();
        responses.insert("eating_habits".to_string(), json!("vegan"));

        let steps = compute_steps(&taxonomy, &responses, false);
        assert!(!steps.contains(&Field::Fixed(FixedField::MeatIntake)));
        assert!(!steps.contains(&Field::Fixed(FixedField::FishIntake)));
    }

    #[test]
    fn alcohol_no_removes_detail_questions() {
        let taxonomy = ConcernTaxonomy::standard();
        let mut responses = BTreeMap::new();
        responses.insert("alcohol".to_string(), json!("no"));

        let steps = compute_steps(&taxonomy, &responses, false);
        assert!(!steps.contains(&Field::Fixed(FixedField::AlcoholFrequency)));
        assert!(!steps.contains(&Field::Fixed(FixedField::AlcoholAmount)));
    }

    #[test]
    fn returning_user_skips_identity_but_keeps_age() {
        let taxonomy = ConcernTaxonomy::standard();
        let steps = compute_steps(&taxonomy, &BTreeMap::new(), true);
        assert!(!steps.contains(&Field::Fixed(FixedField::Name)));
        assert!(!steps.contains(&Field::Fixed(FixedField::Email)));
        assert!(!steps.contains(&Field::Fixed(FixedField::Gender)));
        assert!(steps.contains(&Field::Fixed(FixedField::Age)));
    }

    #[test]
    fn concern_followups_appear_in_selection_order() {
        let taxonomy = ConcernTaxonomy::standard();
        let mut responses = BTreeMap::new();
        responses.insert("concern".to_string(), json!(["stress", "sleep"]));

        let steps = compute_steps(&taxonomy, &responses, false);
        let followups: Vec<&Field> = steps
            .iter()
            .filter(|f| matches!(f, Field::ConcernFollowup { .. }))
            .collect();
        assert!(matches!(
            followups[0],
            Field::ConcernFollowup { concern: ConcernKey::Stress, .. }
        ));
        let stress_count = taxonomy.followups(ConcernKey::Stress).len();
        assert!(matches!(
            followups[stress_count],
            Field::ConcernFollowup { concern: ConcernKey::Sleep, .. }
        ));
    }

    #[test]
    fn medical_treatment_is_always_last() {
        let taxonomy = ConcernTaxonomy::standard();
        let steps = compute_steps(&taxonomy, &BTreeMap::new(), false);
        assert_eq!(steps.last(), Some(&Field::Fixed(FixedField::MedicalTreatment)));
    }
}
