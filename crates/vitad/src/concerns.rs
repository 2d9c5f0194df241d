//! Concern taxonomy: canonical health-concern keys, synonym matching,
//! per-concern follow-up questions, and the keyword/health-goal data the
//! recommendation engine scores against.
//!
//! The taxonomy is an immutable registry built once and injected wherever
//! it is needed; nothing here mutates after construction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical health-concern keys a respondent can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcernKey {
    Sleep,
    Stress,
    Energy,
    StomachIntestines,
    Skin,
    Resistance,
    Weight,
    Libido,
    Brain,
    HairNails,
    Fitness,
    Hormones,
}

impl ConcernKey {
    pub const ALL: [ConcernKey; 12] = [
        ConcernKey::Sleep,
        ConcernKey::Stress,
        ConcernKey::Energy,
        ConcernKey::StomachIntestines,
        ConcernKey::Skin,
        ConcernKey::Resistance,
        ConcernKey::Weight,
        ConcernKey::Libido,
        ConcernKey::Brain,
        ConcernKey::HairNails,
        ConcernKey::Fitness,
        ConcernKey::Hormones,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConcernKey::Sleep => "sleep",
            ConcernKey::Stress => "stress",
            ConcernKey::Energy => "energy",
            ConcernKey::StomachIntestines => "stomach_intestines",
            ConcernKey::Skin => "skin",
            ConcernKey::Resistance => "resistance",
            ConcernKey::Weight => "weight",
            ConcernKey::Libido => "libido",
            ConcernKey::Brain => "brain",
            ConcernKey::HairNails => "hair_nails",
            ConcernKey::Fitness => "fitness",
            ConcernKey::Hormones => "hormones",
        }
    }

    /// Human-readable label used in prompts and session titles.
    pub fn label(&self) -> &'static str {
        match self {
            ConcernKey::Sleep => "Sleep",
            ConcernKey::Stress => "Stress",
            ConcernKey::Energy => "Energy",
            ConcernKey::StomachIntestines => "Stomach and Intestines",
            ConcernKey::Skin => "Skin",
            ConcernKey::Resistance => "Resistance",
            ConcernKey::Weight => "Weight",
            ConcernKey::Libido => "Libido",
            ConcernKey::Brain => "Brain",
            ConcernKey::HairNails => "Hair and Nails",
            ConcernKey::Fitness => "Fitness",
            ConcernKey::Hormones => "Hormones",
        }
    }

    /// Keywords matched against product text during scoring.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            ConcernKey::Sleep => &["sleep", "rest", "relaxation", "tiredness", "fatigue", "calm"],
            ConcernKey::Stress => &["stress", "anxiety", "calm", "relaxation", "psychological"],
            ConcernKey::Energy => &["energy", "fatigue", "tiredness", "vitality", "metabolism"],
            ConcernKey::StomachIntestines => {
                &["digestion", "gut", "stomach", "intestines", "bowel", "digestive"]
            }
            ConcernKey::Skin => &["skin", "collagen", "complexion", "elasticity", "aging"],
            ConcernKey::Resistance => &["immune", "immunity", "resistance", "immune system"],
            ConcernKey::Weight => &["weight", "metabolism", "energy metabolism"],
            ConcernKey::Libido => &["libido", "sexual", "hormone", "hormonal"],
            ConcernKey::Brain => {
                &["brain", "memory", "concentration", "cognitive", "mental", "focus", "learning"]
            }
            ConcernKey::HairNails => &["hair", "nails", "hair growth", "nail health"],
            ConcernKey::Fitness => {
                &["fitness", "muscle", "performance", "recovery", "exercise", "strength"]
            }
            ConcernKey::Hormones => &["hormone", "hormonal", "menstrual", "cycle", "libido"],
        }
    }

    /// Catalog health-goal labels this concern maps onto.
    pub fn health_goals(&self) -> &'static [&'static str] {
        match self {
            ConcernKey::Sleep => &["Sleep"],
            ConcernKey::Stress => &["Stress Management"],
            ConcernKey::Energy => &["Energy Support"],
            ConcernKey::StomachIntestines => &["Digestive Health", "Gut Health"],
            ConcernKey::Skin => &["Skin Health"],
            ConcernKey::Resistance => &["Immune Support"],
            ConcernKey::Weight => &["Weight Management"],
            ConcernKey::Libido => &["Libido"],
            ConcernKey::Brain => &["Brain Health"],
            ConcernKey::HairNails => &["Hair Health", "Nail Health"],
            ConcernKey::Fitness => &["Fitness"],
            ConcernKey::Hormones => &["Hormone Balance"],
        }
    }
}

impl fmt::Display for ConcernKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConcernKey {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConcernKey::ALL
            .iter()
            .find(|key| key.as_str() == s)
            .copied()
            .ok_or(())
    }
}

/// One follow-up question owned by a concern.
#[derive(Debug, Clone, Copy)]
pub struct FollowupQuestion {
    /// Stable question id, used in the storage key `concern|<key>|<id>`.
    pub id: &'static str,
    pub prompt: &'static str,
    /// Enumerated choices; empty means free text.
    pub options: &'static [&'static str],
}

/// Immutable concern registry: synonym table plus follow-up question sets.
#[derive(Debug, Clone)]
pub struct ConcernTaxonomy {
    synonyms: Vec<(&'static str, ConcernKey)>,
}

impl Default for ConcernTaxonomy {
    fn default() -> Self {
        Self::standard()
    }
}

impl ConcernTaxonomy {
    /// The built-in synonym table. Longer synonyms are listed before their
    /// substrings so the fallback scan prefers the most specific match.
    pub fn standard() -> Self {
        let synonyms: Vec<(&'static str, ConcernKey)> = vec![
            ("stomach and intestines", ConcernKey::StomachIntestines),
            ("stomach & intestines", ConcernKey::StomachIntestines),
            ("stomach_intestines", ConcernKey::StomachIntestines),
            ("stomach", ConcernKey::StomachIntestines),
            ("intestines", ConcernKey::StomachIntestines),
            ("digestion", ConcernKey::StomachIntestines),
            ("digestive", ConcernKey::StomachIntestines),
            ("gut", ConcernKey::StomachIntestines),
            ("bloating", ConcernKey::StomachIntestines),
            ("hair and nails", ConcernKey::HairNails),
            ("hair & nails", ConcernKey::HairNails),
            ("hair_nails", ConcernKey::HairNails),
            ("hair", ConcernKey::HairNails),
            ("nails", ConcernKey::HairNails),
            ("sleeping", ConcernKey::Sleep),
            ("sleep", ConcernKey::Sleep),
            ("insomnia", ConcernKey::Sleep),
            ("rest", ConcernKey::Sleep),
            ("stress", ConcernKey::Stress),
            ("anxiety", ConcernKey::Stress),
            ("tension", ConcernKey::Stress),
            ("energy", ConcernKey::Energy),
            ("tired", ConcernKey::Energy),
            ("tiredness", ConcernKey::Energy),
            ("fatigue", ConcernKey::Energy),
            ("skin", ConcernKey::Skin),
            ("complexion", ConcernKey::Skin),
            ("acne", ConcernKey::Skin),
            ("resistance", ConcernKey::Resistance),
            ("immune system", ConcernKey::Resistance),
            ("immunity", ConcernKey::Resistance),
            ("immune", ConcernKey::Resistance),
            ("weight", ConcernKey::Weight),
            ("metabolism", ConcernKey::Weight),
            ("libido", ConcernKey::Libido),
            ("sex drive", ConcernKey::Libido),
            ("concentration", ConcernKey::Brain),
            ("memory", ConcernKey::Brain),
            ("focus", ConcernKey::Brain),
            ("brain", ConcernKey::Brain),
            ("fitness", ConcernKey::Fitness),
            ("muscle", ConcernKey::Fitness),
            ("sport", ConcernKey::Fitness),
            ("workout", ConcernKey::Fitness),
            ("hormones", ConcernKey::Hormones),
            ("hormone", ConcernKey::Hormones),
            ("hormonal", ConcernKey::Hormones),
            ("menstrual", ConcernKey::Hormones),
            ("cycle", ConcernKey::Hormones),
        ];
        Self { synonyms }
    }

    /// Parse free text into an ordered, deduplicated list of canonical
    /// concern keys.
    ///
    /// Tokens are split on commas, slashes, semicolons, and the word "and";
    /// each token is matched exactly against the synonym table first, then
    /// by substring scan. First-appearance order is preserved.
    pub fn normalize(&self, raw: &str) -> Vec<ConcernKey> {
        let lowered = raw.to_lowercase();
        let mut found = Vec::new();
        for part in lowered.split([',', '/', ';']) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            for key in self.match_token(part) {
                if !found.contains(&key) {
                    found.push(key);
                }
            }
        }
        found
    }

    /// Match one comma-separated token. "stomach and intestines" is itself
    /// a synonym, so the whole token is tried before " and " is treated as
    /// a separator.
    fn match_token(&self, token: &str) -> Vec<ConcernKey> {
        if let Some(key) = self.exact(token) {
            return vec![key];
        }
        if token.contains(" and ") {
            return token
                .split(" and ")
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .filter_map(|part| self.exact(part).or_else(|| self.scan(part)))
                .collect();
        }
        self.scan(token).into_iter().collect()
    }

    fn exact(&self, token: &str) -> Option<ConcernKey> {
        self.synonyms
            .iter()
            .find(|(synonym, _)| *synonym == token)
            .map(|(_, key)| *key)
    }

    /// Substring fallback scan, most specific synonym first.
    fn scan(&self, token: &str) -> Option<ConcernKey> {
        self.synonyms
            .iter()
            .find(|(synonym, _)| token.contains(synonym))
            .map(|(_, key)| *key)
    }

    /// Ordered follow-up question set for one concern.
    pub fn followups(&self, key: ConcernKey) -> &'static [FollowupQuestion] {
        followups(key)
    }
}

/// Ordered follow-up question set for one concern. Static data; the
/// taxonomy method delegates here.
pub fn followups(key: ConcernKey) -> &'static [FollowupQuestion] {
    match key {
        ConcernKey::Sleep => &[
            FollowupQuestion {
                id: "trouble",
                prompt: "What best describes your sleep trouble?",
                options: &["falling asleep", "staying asleep", "waking up tired"],
            },
            FollowupQuestion {
                id: "hours",
                prompt: "How many hours do you usually sleep per night?",
                options: &["less than 6", "6-7", "7-8", "more than 8"],
            },
            FollowupQuestion {
                id: "screens",
                prompt: "Do you use screens in the hour before bed?",
                options: &["yes", "no"],
            },
        ],
        ConcernKey::Stress => &[
            FollowupQuestion {
                id: "frequency",
                prompt: "How often do you feel stressed?",
                options: &["daily", "a few times a week", "occasionally"],
            },
            FollowupQuestion {
                id: "source",
                prompt: "What is the main source of your stress?",
                options: &["work", "family", "health", "other"],
            },
        ],
        ConcernKey::Energy => &[
            FollowupQuestion {
                id: "dip",
                prompt: "When does your energy dip the most?",
                options: &["morning", "afternoon", "evening", "all day"],
            },
            FollowupQuestion {
                id: "exercise",
                prompt: "How often do you exercise?",
                options: &["daily", "weekly", "rarely", "never"],
            },
        ],
        ConcernKey::StomachIntestines => &[
            FollowupQuestion {
                id: "symptom",
                prompt: "Which digestive symptom bothers you most?",
                options: &["bloating", "irregularity", "cramps", "heartburn"],
            },
            FollowupQuestion {
                id: "frequency",
                prompt: "How often do you notice digestive discomfort?",
                options: &["daily", "a few times a week", "occasionally"],
            },
            FollowupQuestion {
                id: "fiber",
                prompt: "Do you eat fiber-rich foods like vegetables and whole grains daily?",
                options: &["yes", "no"],
            },
        ],
        ConcernKey::Skin => &[
            FollowupQuestion {
                id: "goal",
                prompt: "What is your main skin goal?",
                options: &["hydration", "fewer breakouts", "firmness", "glow"],
            },
            FollowupQuestion {
                id: "sun",
                prompt: "How much sun exposure do you get on a typical day?",
                options: &["a lot", "moderate", "very little"],
            },
        ],
        ConcernKey::Resistance => &[
            FollowupQuestion {
                id: "colds",
                prompt: "How often do you catch a cold?",
                options: &["rarely", "a few times a year", "almost every month"],
            },
            FollowupQuestion {
                id: "season",
                prompt: "Do you feel your resistance drops in winter?",
                options: &["yes", "no"],
            },
        ],
        ConcernKey::Weight => &[
            FollowupQuestion {
                id: "goal",
                prompt: "What is your weight goal?",
                options: &["lose weight", "maintain weight", "gain weight"],
            },
            FollowupQuestion {
                id: "snacking",
                prompt: "How often do you snack between meals?",
                options: &["often", "sometimes", "rarely"],
            },
        ],
        ConcernKey::Libido => &[
            FollowupQuestion {
                id: "duration",
                prompt: "How long have you noticed a change in your libido?",
                options: &["less than a month", "a few months", "longer"],
            },
            FollowupQuestion {
                id: "energy",
                prompt: "Do you also feel low on energy?",
                options: &["yes", "no"],
            },
        ],
        ConcernKey::Brain => &[
            FollowupQuestion {
                id: "focus",
                prompt: "When do you find it hardest to concentrate?",
                options: &["morning", "afternoon", "evening", "all day"],
            },
            FollowupQuestion {
                id: "memory",
                prompt: "Do you notice forgetting small things more often?",
                options: &["yes", "no"],
            },
        ],
        ConcernKey::HairNails => &[
            FollowupQuestion {
                id: "focus",
                prompt: "What bothers you most?",
                options: &["hair loss", "dull hair", "brittle nails"],
            },
            FollowupQuestion {
                id: "duration",
                prompt: "How long has this been going on?",
                options: &["less than a month", "a few months", "longer"],
            },
        ],
        ConcernKey::Fitness => &[
            FollowupQuestion {
                id: "goal",
                prompt: "What is your main fitness goal?",
                options: &["build muscle", "improve endurance", "faster recovery"],
            },
            FollowupQuestion {
                id: "frequency",
                prompt: "How many times per week do you train?",
                options: &["1-2", "3-4", "5 or more"],
            },
        ],
        ConcernKey::Hormones => &[
            FollowupQuestion {
                id: "symptom",
                prompt: "Which symptom do you notice most?",
                options: &["irregular cycle", "mood swings", "low energy"],
            },
            FollowupQuestion {
                id: "duration",
                prompt: "How long have you experienced this?",
                options: &["less than a month", "a few months", "longer"],
            },
        ],
    }
}
