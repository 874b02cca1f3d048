//! Pattern-based fact extraction from user messages.
//!
//! Four fixed patterns are tried independently, so one message can yield
//! several facts. Captures stop at the first character that is not a letter,
//! digit or whitespace. Nothing is deduplicated against existing memory.

use std::sync::OnceLock;

use regex::Regex;

use crate::state::{BoundedLog, MemoryFact};

/// Small-talk phrases that must not produce an identity fact.
const IDENTITY_EXCLUSIONS: [&str; 2] = ["i am here", "i am good"];

struct Patterns {
    name: Regex,
    likes: Regex,
    dislikes: Regex,
    identity: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        name: Regex::new(r"(?i)my name is (\w+)").unwrap(),
        likes: Regex::new(r"(?i)i (?:like|love|enjoy) ([\w\s]+)").unwrap(),
        dislikes: Regex::new(r"(?i)i (?:hate|dislike|don't like) ([\w\s]+)").unwrap(),
        identity: Regex::new(r"(?i)i(?:'m| am) (?:a |an )?([\w\s]+)").unwrap(),
    })
}

fn capture<'a>(re: &Regex, text: &'a str) -> Option<&'a str> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end())
        .filter(|s| !s.is_empty())
}

/// Facts implied by a single user message, in rule order.
///
/// The bot reply is accepted for future rules but not consulted today.
pub fn extract_facts(user_message: &str, _bot_response: &str) -> Vec<String> {
    let p = patterns();
    let mut facts = Vec::new();

    if let Some(name) = capture(&p.name, user_message) {
        facts.push(format!("User's name is {}", name));
    }

    if let Some(liked) = capture(&p.likes, user_message) {
        facts.push(format!("User likes {}", liked));
    }

    if let Some(disliked) = capture(&p.dislikes, user_message) {
        facts.push(format!("User dislikes {}", disliked));
    }

    let lowered = user_message.to_lowercase();
    let small_talk = IDENTITY_EXCLUSIONS.iter().any(|phrase| lowered.contains(phrase));
    if !small_talk {
        if let Some(identity) = capture(&p.identity, user_message) {
            facts.push(format!("User is {}", identity));
        }
    }

    facts
}

/// Run extraction and append whatever was found to `memory`.
///
/// Returns the number of facts added (some may already have been evicted
/// again if more than the capacity were found at once).
pub fn remember(memory: &mut BoundedLog<MemoryFact>, user_message: &str, bot_response: &str) -> usize {
    let facts = extract_facts(user_message, bot_response);
    let count = facts.len();
    if count > 0 {
        tracing::debug!(count, "extracted memory facts");
    }
    memory.extend(facts.into_iter().map(MemoryFact::new));
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MEMORY_CAPACITY;

    #[test]
    fn name_is_captured_with_original_casing() {
        assert_eq!(extract_facts("My name is Alex", ""), vec!["User's name is Alex"]);
    }

    #[test]
    fn name_capture_is_one_word() {
        assert_eq!(
            extract_facts("my name is Mary Jane", ""),
            vec!["User's name is Mary"]
        );
    }

    #[test]
    fn like_and_identity_in_one_message() {
        let facts = extract_facts("I like pizza and I'm a teacher", "");
        assert_eq!(facts.len(), 2);
        assert!(facts[0].starts_with("User likes pizza"));
        assert_eq!(facts[1], "User is teacher");
    }

    #[test]
    fn punctuation_ends_capture() {
        assert_eq!(
            extract_facts("I love hiking, especially in fall.", ""),
            vec!["User likes hiking"]
        );
    }

    #[test]
    fn dislikes_are_recognised() {
        assert_eq!(extract_facts("I hate mondays", ""), vec!["User dislikes mondays"]);
        assert_eq!(
            extract_facts("Honestly I don't like olives!", ""),
            vec!["User dislikes olives"]
        );
    }

    #[test]
    fn small_talk_suppresses_identity() {
        assert!(extract_facts("I am here", "").is_empty());
        assert!(extract_facts("Thanks, I am good", "").is_empty());
        assert!(extract_facts("I AM GOOD", "").is_empty());
    }

    #[test]
    fn identity_strips_article() {
        assert_eq!(extract_facts("I am an engineer", ""), vec!["User is engineer"]);
    }

    #[test]
    fn unrelated_text_yields_nothing() {
        assert!(extract_facts("What's the weather like?", "It's sunny.").is_empty());
    }

    #[test]
    fn remember_accumulates_duplicates_up_to_cap() {
        let mut memory = BoundedLog::new(MEMORY_CAPACITY);
        for _ in 0..25 {
            remember(&mut memory, "My name is Alex", "Nice to meet you");
        }
        assert_eq!(memory.len(), MEMORY_CAPACITY);
        assert!(memory.iter().all(|f| f.text == "User's name is Alex"));
    }
}
