//! Second-to-third-person rewriting for family-member interviews.
//!
//! When the user answers on behalf of someone else, question prompts
//! written in the second person ("How many hours do you sleep?") are
//! rewritten to refer to the subject ("How many hours does your mother
//! sleep?"). The rewrite is word-boundary based and case-preserving.

/// Rewrite a second-person prompt to third person for `subject`
/// (for example "your mother" or a first name).
pub fn personalize(prompt: &str, subject: &str) -> String {
    let tokens = split_words(prompt);
    let mut out = String::with_capacity(prompt.len() + subject.len());

    for (idx, token) in tokens.iter().enumerate() {
        match token {
            Token::Word(w) => {
                let lower = w.to_lowercase();
                let replaced = match lower.as_str() {
                    "you" | "yourself" => Some(subject.to_string()),
                    "your" => Some(format!("{subject}'s")),
                    "yours" => Some(format!("{subject}'s")),
                    // "do you" -> "does <subject>", same for are/have
                    "do" if next_word_is_you(&tokens, idx) => Some("does".to_string()),
                    "are" if next_word_is_you(&tokens, idx) => Some("is".to_string()),
                    "have" if next_word_is_you(&tokens, idx) => Some("has".to_string()),
                    _ => None,
                };
                match replaced {
                    Some(r) => out.push_str(&match_case(w, &r)),
                    None => out.push_str(w),
                }
            }
            Token::Other(s) => out.push_str(s),
        }
    }
    out
}

enum Token<'a> {
    Word(&'a str),
    Other(&'a str),
}

fn split_words(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_word = false;
    for (i, c) in text.char_indices() {
        let is_word = c.is_alphanumeric() || c == '\'';
        if is_word != in_word {
            if i > start {
                tokens.push(if in_word {
                    Token::Word(&text[start..i])
                } else {
                    Token::Other(&text[start..i])
                });
            }
            start = i;
            in_word = is_word;
        }
    }
    if start < text.len() {
        tokens.push(if in_word {
            Token::Word(&text[start..])
        } else {
            Token::Other(&text[start..])
        });
    }
    tokens
}

fn next_word_is_you(tokens: &[Token<'_>], idx: usize) -> bool {
    tokens[idx + 1..].iter().find_map(|t| match t {
        Token::Word(w) => Some(w.eq_ignore_ascii_case("you")),
        Token::Other(_) => None,
    }) == Some(true)
}

fn match_case(original: &str, replacement: &str) -> String {
    if original.chars().next().is_some_and(|c| c.is_uppercase()) {
        let mut chars = replacement.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => String::new(),
        }
    } else {
        replacement.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_you_and_your() {
        assert_eq!(
            personalize("How many hours do you usually sleep?", "your mother"),
            "How many hours does your mother usually sleep?"
        );
        assert_eq!(
            personalize("Do you have any allergies?", "your mother"),
            "Does your mother have any allergies?"
        );
    }

    #[test]
    fn preserves_case_at_sentence_start() {
        assert_eq!(
            personalize("You mentioned stress.", "your father"),
            "Your father mentioned stress."
        );
    }

    #[test]
    fn possessive_form() {
        assert_eq!(
            personalize("What is your age?", "your mother"),
            "What is your mother's age?"
        );
    }

    #[test]
    fn leaves_third_person_prompts_alone() {
        let prompt = "Which concern matters most?";
        assert_eq!(personalize(prompt, "your sister"), prompt);
    }
}
