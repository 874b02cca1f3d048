//! Character personas and the roster that holds them.
//!
//! The roster always contains the default assistant. It can be overwritten
//! with a new personality but never removed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};

pub const DEFAULT_CHARACTER_NAME: &str = "AI Assistant";
pub const DEFAULT_PERSONALITY: &str = "Helpful, friendly, and knowledgeable assistant";
pub const DEFAULT_AVATAR: &str = "🤖";

/// Personality used when a new character is created without one
pub const FALLBACK_PERSONALITY: &str = "Friendly assistant";
/// Avatar used when a new character is created without one
pub const FALLBACK_AVATAR: &str = "👤";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    pub personality: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backstory: Option<String>,
    pub avatar: String,
}

impl Character {
    pub fn default_assistant() -> Self {
        Self {
            name: DEFAULT_CHARACTER_NAME.to_string(),
            personality: DEFAULT_PERSONALITY.to_string(),
            backstory: None,
            avatar: DEFAULT_AVATAR.to_string(),
        }
    }

    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_CHARACTER_NAME
    }
}

/// Raw fields from the character creation form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharacterDraft {
    pub name: String,
    pub personality: String,
    pub backstory: String,
    pub avatar: String,
}

impl CharacterDraft {
    /// Validate and normalise the form into a character.
    ///
    /// Only the name is required. Blank personality and avatar fall back to
    /// fixed defaults, a blank backstory becomes `None`.
    pub fn build(&self) -> Result<Character> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ChatError::Validation(
                "Please enter a character name".to_string(),
            ));
        }

        let personality = match self.personality.trim() {
            "" => FALLBACK_PERSONALITY,
            p => p,
        };
        let backstory = Some(self.backstory.trim())
            .filter(|b| !b.is_empty())
            .map(str::to_string);
        let avatar = match self.avatar.trim() {
            "" => FALLBACK_AVATAR,
            a => a,
        };

        Ok(Character {
            name: name.to_string(),
            personality: personality.to_string(),
            backstory,
            avatar: avatar.to_string(),
        })
    }
}

/// Characters keyed by name
#[derive(Debug, Clone)]
pub struct CharacterRoster {
    default: Character,
    others: BTreeMap<String, Character>,
}

impl Default for CharacterRoster {
    fn default() -> Self {
        Self::new()
    }
}

impl CharacterRoster {
    pub fn new() -> Self {
        Self {
            default: Character::default_assistant(),
            others: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Character> {
        if name == DEFAULT_CHARACTER_NAME {
            Some(&self.default)
        } else {
            self.others.get(name)
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// The default character. Always present.
    pub fn default_character(&self) -> &Character {
        &self.default
    }

    /// Look a character up, falling back to the default for unknown names.
    pub fn resolve(&self, name: &str) -> &Character {
        self.get(name).unwrap_or(&self.default)
    }

    /// Insert or overwrite a character, returning the stored copy.
    pub fn upsert(&mut self, character: Character) -> &Character {
        if character.is_default() {
            self.default = character;
            return &self.default;
        }
        let name = character.name.clone();
        self.others.insert(name.clone(), character);
        &self.others[&name]
    }

    pub fn remove(&mut self, name: &str) -> Result<Character> {
        if name == DEFAULT_CHARACTER_NAME {
            return Err(ChatError::Validation(
                "Cannot delete the default character".to_string(),
            ));
        }
        self.others
            .remove(name)
            .ok_or_else(|| ChatError::CharacterNotFound(name.to_string()))
    }

    /// Default first, then the rest alphabetically.
    pub fn list(&self) -> Vec<&Character> {
        std::iter::once(&self.default)
            .chain(self.others.values())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.others.len() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str, personality: &str) -> CharacterDraft {
        CharacterDraft {
            name: name.to_string(),
            personality: personality.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn draft_requires_a_name() {
        let err = draft("   ", "grumpy").build().unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));
    }

    #[test]
    fn draft_fills_in_defaults() {
        let character = draft("  Sherlock ", "").build().unwrap();
        assert_eq!(character.name, "Sherlock");
        assert_eq!(character.personality, FALLBACK_PERSONALITY);
        assert_eq!(character.avatar, FALLBACK_AVATAR);
        assert_eq!(character.backstory, None);
    }

    #[test]
    fn draft_keeps_backstory_when_present() {
        let mut d = draft("Ada", "Curious mathematician");
        d.backstory = "  Wrote the first program. ".to_string();
        d.avatar = "🧮".to_string();
        let character = d.build().unwrap();
        assert_eq!(character.backstory.as_deref(), Some("Wrote the first program."));
        assert_eq!(character.avatar, "🧮");
    }

    #[test]
    fn default_character_cannot_be_removed() {
        let mut roster = CharacterRoster::new();
        assert!(roster.remove(DEFAULT_CHARACTER_NAME).is_err());
        assert!(roster.contains(DEFAULT_CHARACTER_NAME));
    }

    #[test]
    fn remove_unknown_reports_not_found() {
        let mut roster = CharacterRoster::new();
        let err = roster.remove("Nobody").unwrap_err();
        assert!(matches!(err, ChatError::CharacterNotFound(name) if name == "Nobody"));
    }

    #[test]
    fn upsert_overwrites_by_name() {
        let mut roster = CharacterRoster::new();
        roster.upsert(draft("Pirate", "Says arr").build().unwrap());
        roster.upsert(draft("Pirate", "Says ahoy").build().unwrap());

        assert_eq!(roster.len(), 2);
        assert_eq!(roster.get("Pirate").unwrap().personality, "Says ahoy");
    }

    #[test]
    fn resolve_falls_back_to_default() {
        let roster = CharacterRoster::new();
        assert!(roster.resolve("ghost").is_default());
    }

    #[test]
    fn list_puts_default_first() {
        let mut roster = CharacterRoster::new();
        roster.upsert(draft("Zed", "").build().unwrap());
        roster.upsert(draft("Ada", "").build().unwrap());

        let names: Vec<&str> = roster.list().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec![DEFAULT_CHARACTER_NAME, "Ada", "Zed"]);
    }
}
