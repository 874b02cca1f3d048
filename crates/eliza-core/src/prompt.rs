use crate::character::Character;
use crate::state::{BoundedLog, ConversationTurn, MemoryFact};

/// How many memory facts and past turns are shown to the model.
pub const PROMPT_WINDOW: usize = 5;

/// Build the completion prompt for one user turn.
///
/// Memory and conversation blocks are left out entirely when empty. Message
/// text is passed through as-is.
pub fn build_prompt(
    character: &Character,
    memory: &BoundedLog<MemoryFact>,
    turns: &BoundedLog<ConversationTurn>,
    user_message: &str,
) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!("You are {}. {}\n\n", character.name, character.personality));

    if !memory.is_empty() {
        prompt.push_str("What you know about the user:\n");
        for fact in memory.recent(PROMPT_WINDOW) {
            prompt.push_str(&format!("- {}\n", fact.text));
        }
        prompt.push('\n');
    }

    if !turns.is_empty() {
        prompt.push_str("Recent conversation:\n");
        for turn in turns.recent(PROMPT_WINDOW) {
            prompt.push_str(&format!("User: {}\n", turn.user_text));
            prompt.push_str(&format!("{}: {}\n", character.name, turn.bot_text));
        }
        prompt.push('\n');
    }

    prompt.push_str(&format!("User: {}\n{}:", user_message, character.name));
    prompt
}
