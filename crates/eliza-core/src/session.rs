//! One user's chat session.
//!
//! `Session` owns everything a conversation needs: the character roster and
//! active persona, the visible transcript, the rolling turn history, extracted
//! memory, backend settings and a busy flag that allows only one outstanding
//! generation at a time.
//!
//! A turn is split in two so the caller decides how the network call runs:
//! [`Session::begin_turn`] records the user message and returns the prompt,
//! [`Session::complete_turn`] records whatever the backend produced.
//! [`Session::send`] does both for callers that can simply await.

use tracing::{debug, info, warn};

use crate::ai::Backend;
use crate::character::{Character, CharacterDraft, CharacterRoster};
use crate::config::BackendConfig;
use crate::error::{ChatError, Result};
use crate::memory;
use crate::prompt::build_prompt;
use crate::state::{
    BoundedLog, ConversationTurn, MemoryFact, Message, ERROR_GLYPH, GREETING,
    HISTORY_CAPACITY, MEMORY_CAPACITY,
};
use crate::status::{self, BackendStatus};

/// A user message waiting for its reply
#[derive(Debug, Clone)]
pub struct PendingTurn {
    user_text: String,
    prompt: String,
}

impl PendingTurn {
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn user_text(&self) -> &str {
        &self.user_text
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    roster: CharacterRoster,
    active: String,
    persona: Character,
    messages: Vec<Message>,
    turns: BoundedLog<ConversationTurn>,
    memory: BoundedLog<MemoryFact>,
    config: BackendConfig,
    status: BackendStatus,
    auto_memory: bool,
    busy: bool,
    next_id: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(BackendConfig::default())
    }
}

impl Session {
    pub fn new(config: BackendConfig) -> Self {
        let roster = CharacterRoster::new();
        let persona = roster.default_character().clone();
        let mut session = Self {
            active: persona.name.clone(),
            persona,
            roster,
            messages: Vec::new(),
            turns: BoundedLog::new(HISTORY_CAPACITY),
            memory: BoundedLog::new(MEMORY_CAPACITY),
            config,
            status: BackendStatus::default(),
            auto_memory: true,
            busy: false,
            next_id: 1,
        };
        session.reset_transcript();
        session
    }

    // Accessors
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn turns(&self) -> &BoundedLog<ConversationTurn> {
        &self.turns
    }

    pub fn memory(&self) -> &BoundedLog<MemoryFact> {
        &self.memory
    }

    pub fn roster(&self) -> &CharacterRoster {
        &self.roster
    }

    /// Roster key of the active character
    pub fn active_name(&self) -> &str {
        &self.active
    }

    /// The persona used for prompting. Starts as a copy of the active
    /// character and may be edited from settings.
    pub fn persona(&self) -> &Character {
        &self.persona
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut BackendConfig {
        &mut self.config
    }

    pub fn status(&self) -> &BackendStatus {
        &self.status
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Whether completed turns feed the fact extractor
    pub fn auto_memory(&self) -> bool {
        self.auto_memory
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.busy {
            return Err(ChatError::Busy);
        }
        Ok(())
    }

    fn push_message(&mut self, is_from_bot: bool, text: String) -> &Message {
        let id = self.next_id;
        self.next_id += 1;
        let message = if is_from_bot {
            Message::bot(id, text)
        } else {
            Message::user(id, text)
        };
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    // Turns
    /// Record the user's message and build the prompt for it.
    ///
    /// Fails with `Validation` for blank input and `Busy` while another
    /// reply is outstanding; the transcript is untouched in both cases.
    pub fn begin_turn(&mut self, input: &str) -> Result<PendingTurn> {
        let user_text = input.trim();
        if user_text.is_empty() {
            return Err(ChatError::Validation("Message is empty".to_string()));
        }
        if self.busy {
            return Err(ChatError::Busy);
        }

        let prompt = build_prompt(&self.persona, &self.memory, &self.turns, user_text);
        self.push_message(false, user_text.to_string());
        self.busy = true;

        Ok(PendingTurn {
            user_text: user_text.to_string(),
            prompt,
        })
    }

    /// Record the backend's answer (or failure) for a pending turn.
    ///
    /// A reply extends the turn history and feeds memory extraction. A failure
    /// becomes a bot message starting with the error glyph; history and
    /// memory are left alone.
    pub fn complete_turn(&mut self, pending: PendingTurn, outcome: Result<String>) -> &Message {
        self.busy = false;

        match outcome {
            Ok(reply) => {
                self.turns.push(ConversationTurn {
                    user_text: pending.user_text.clone(),
                    bot_text: reply.clone(),
                });
                if self.auto_memory {
                    memory::remember(&mut self.memory, &pending.user_text, &reply);
                }
                self.push_message(true, reply)
            }
            Err(err) => {
                warn!(error = %err, "turn failed");
                self.push_message(true, format!("{} {}", ERROR_GLYPH, err))
            }
        }
    }

    /// Run a whole turn against `backend`.
    pub async fn send(&mut self, backend: &dyn Backend, input: &str) -> Result<&Message> {
        let pending = self.begin_turn(input)?;
        let outcome = backend.generate(pending.prompt(), &self.config).await;
        Ok(self.complete_turn(pending, outcome))
    }

    fn reset_transcript(&mut self) {
        self.messages.clear();
        self.next_id = 1;
        self.turns.clear();
        self.push_message(true, GREETING.to_string());
    }

    /// Reset the transcript to the greeting and forget the turn history.
    /// Memory survives. Refused while a reply is outstanding.
    pub fn clear_chat(&mut self) -> Result<()> {
        self.ensure_idle()?;
        self.reset_transcript();
        Ok(())
    }

    // Memory
    /// Store a fact the user typed in directly.
    pub fn add_memory(&mut self, fact: &str) -> Result<()> {
        let fact = fact.trim();
        if fact.is_empty() {
            return Err(ChatError::Validation("Enter a fact".to_string()));
        }
        self.memory.push(MemoryFact::new(fact));
        debug!(%fact, "memory added by user");
        Ok(())
    }

    pub fn set_auto_memory(&mut self, enabled: bool) {
        self.auto_memory = enabled;
    }

    pub fn clear_memories(&mut self) {
        self.memory.clear();
    }

    // Characters
    /// Validate the form, store the character and make it the active persona.
    pub fn create_character(&mut self, draft: &CharacterDraft) -> Result<&Character> {
        self.ensure_idle()?;
        let character = draft.build()?;
        info!(name = %character.name, "character created");
        self.active = character.name.clone();
        self.persona = character.clone();
        Ok(self.roster.upsert(character))
    }

    /// Activate `name` (or the default if it doesn't exist) and start a
    /// fresh conversation.
    pub fn switch_character(&mut self, name: &str) -> Result<()> {
        self.ensure_idle()?;
        let character = self.roster.resolve(name).clone();
        if character.name != name {
            warn!(requested = %name, "unknown character, using default");
        }
        info!(name = %character.name, "switched character");
        self.active = character.name.clone();
        self.persona = character;
        self.reset_transcript();
        Ok(())
    }

    /// Remove a character. Deleting the active one falls back to the default.
    pub fn delete_character(&mut self, name: &str) -> Result<()> {
        self.ensure_idle()?;
        self.roster.remove(name)?;
        info!(%name, "character deleted");

        if self.active == name {
            let fallback = self.roster.default_character().clone();
            self.active = fallback.name.clone();
            self.persona = fallback;
        }
        Ok(())
    }

    pub fn set_persona_name(&mut self, name: &str) {
        self.persona.name = name.to_string();
    }

    pub fn set_persona_personality(&mut self, personality: &str) {
        self.persona.personality = personality.to_string();
    }

    // Diagnostics
    pub fn record_status(&mut self, status: BackendStatus) {
        self.status = status;
    }

    pub async fn refresh_status(&mut self, backend: &dyn Backend) -> &BackendStatus {
        self.status = status::check_backend(backend, &self.config).await;
        &self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::DEFAULT_CHARACTER_NAME;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Backend that replays canned outcomes and records prompts.
    #[derive(Default)]
    struct ScriptedBackend {
        replies: Mutex<Vec<Result<String>>>,
        prompts: Mutex<Vec<String>>,
        models: Vec<String>,
    }

    impl ScriptedBackend {
        fn replying(replies: Vec<Result<String>>) -> Self {
            let mut replies = replies;
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                ..Default::default()
            }
        }

        fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl Backend for ScriptedBackend {
        async fn generate(&self, prompt: &str, _config: &BackendConfig) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok("ok".to_string()))
        }

        async fn list_models(&self, _config: &BackendConfig) -> Result<Vec<String>> {
            Ok(self.models.clone())
        }
    }

    fn draft(name: &str, personality: &str) -> CharacterDraft {
        CharacterDraft {
            name: name.to_string(),
            personality: personality.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn new_session_starts_with_greeting() {
        let session = Session::default();
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].text, GREETING);
        assert!(session.messages()[0].is_from_bot);
        assert_eq!(session.active_name(), DEFAULT_CHARACTER_NAME);
    }

    #[tokio::test]
    async fn successful_turn_updates_history_and_memory() {
        let backend = ScriptedBackend::replying(vec![Ok("Nice to meet you, Alex!".into())]);
        let mut session = Session::default();

        let reply = session.send(&backend, "  My name is Alex  ").await.unwrap();
        assert_eq!(reply.text, "Nice to meet you, Alex!");

        assert_eq!(session.messages().len(), 3);
        assert_eq!(session.messages()[1].text, "My name is Alex");
        assert_eq!(session.turns().len(), 1);
        assert_eq!(
            session.memory().iter().map(|f| f.text.as_str()).collect::<Vec<_>>(),
            vec!["User's name is Alex"]
        );
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn memory_and_history_reach_the_next_prompt() {
        let backend = ScriptedBackend::replying(vec![Ok("Hi Alex".into()), Ok("Sure".into())]);
        let mut session = Session::default();

        session.send(&backend, "My name is Alex").await.unwrap();
        session.send(&backend, "Tell me a joke").await.unwrap();

        let prompt = backend.last_prompt();
        assert!(prompt.contains("What you know about the user:\n- User's name is Alex\n"));
        assert!(prompt.contains("Recent conversation:\nUser: My name is Alex\nAI Assistant: Hi Alex\n"));
        assert!(prompt.ends_with("User: Tell me a joke\nAI Assistant:"));
    }

    #[tokio::test]
    async fn failed_turn_appends_error_and_keeps_transcript() {
        let backend = ScriptedBackend::replying(vec![
            Ok("first".into()),
            Err(ChatError::ConnectionFailure {
                endpoint: "http://localhost:11434".into(),
            }),
        ]);
        let mut session = Session::default();
        session.send(&backend, "hello").await.unwrap();
        let before: Vec<Message> = session.messages().to_vec();

        let reply = session.send(&backend, "are you there?").await.unwrap();
        assert!(reply.is_from_bot);
        assert!(reply.text.starts_with(ERROR_GLYPH));
        assert!(reply.is_error());
        assert!(reply.text.contains("Can't connect to Ollama"));

        assert_eq!(&session.messages()[..before.len()], &before[..]);
        assert_eq!(session.turns().len(), 1);
        assert!(!session.is_busy());
    }

    #[test]
    fn second_turn_is_refused_while_busy() {
        let mut session = Session::default();
        let pending = session.begin_turn("first").unwrap();
        assert!(session.is_busy());

        let err = session.begin_turn("second").unwrap_err();
        assert!(matches!(err, ChatError::Busy));
        assert_eq!(session.messages().len(), 2);

        session.complete_turn(pending, Ok("done".into()));
        assert!(session.begin_turn("second").is_ok());
    }

    #[test]
    fn blank_input_is_rejected() {
        let mut session = Session::default();
        assert!(matches!(session.begin_turn("   "), Err(ChatError::Validation(_))));
        assert_eq!(session.messages().len(), 1);
        assert!(!session.is_busy());
    }

    #[test]
    fn history_is_capped() {
        let mut session = Session::default();
        for i in 0..25 {
            let pending = session.begin_turn(&format!("question {}", i)).unwrap();
            session.complete_turn(pending, Ok(format!("answer {}", i)));
            assert!(session.turns().len() <= HISTORY_CAPACITY);
        }
        assert_eq!(session.turns().len(), HISTORY_CAPACITY);
        assert_eq!(session.turns().iter().next().unwrap().user_text, "question 15");
        // the transcript itself is never trimmed
        assert_eq!(session.messages().len(), 51);
    }

    #[test]
    fn switching_resets_transcript_but_keeps_memory() {
        let mut session = Session::default();
        session.create_character(&draft("Pirate", "Says arr")).unwrap();
        let pending = session.begin_turn("I love treasure").unwrap();
        session.complete_turn(pending, Ok("Arr!".into()));

        session.switch_character(DEFAULT_CHARACTER_NAME).unwrap();

        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].text, GREETING);
        assert!(session.turns().is_empty());
        assert_eq!(session.memory().len(), 1);
    }

    #[test]
    fn switching_to_unknown_falls_back_to_default() {
        let mut session = Session::default();
        session.create_character(&draft("Pirate", "Says arr")).unwrap();

        session.switch_character("Ghost").unwrap();
        assert_eq!(session.active_name(), DEFAULT_CHARACTER_NAME);
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn create_activates_without_clearing() {
        let mut session = Session::default();
        let pending = session.begin_turn("hi").unwrap();
        session.complete_turn(pending, Ok("hello".into()));

        let created = session.create_character(&draft("Sage", "")).unwrap();
        assert_eq!(created.personality, "Friendly assistant");
        assert_eq!(session.active_name(), "Sage");
        assert_eq!(session.persona().name, "Sage");
        assert_eq!(session.messages().len(), 3);
    }

    #[test]
    fn create_with_blank_name_changes_nothing() {
        let mut session = Session::default();
        let err = session.create_character(&draft("  ", "mysterious")).unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));
        assert_eq!(session.roster().len(), 1);
        assert_eq!(session.active_name(), DEFAULT_CHARACTER_NAME);
    }

    #[test]
    fn default_character_cannot_be_deleted() {
        let mut session = Session::default();
        session.create_character(&draft("Pirate", "Says arr")).unwrap();

        assert!(session.delete_character(DEFAULT_CHARACTER_NAME).is_err());
        session.switch_character(DEFAULT_CHARACTER_NAME).unwrap();
        assert!(session.delete_character(DEFAULT_CHARACTER_NAME).is_err());
        assert!(session.roster().contains(DEFAULT_CHARACTER_NAME));
    }

    #[test]
    fn deleting_active_character_restores_default_persona() {
        let mut session = Session::default();
        session.create_character(&draft("Pirate", "Says arr")).unwrap();
        session.set_persona_personality("Edited");

        session.delete_character("Pirate").unwrap();

        assert_eq!(session.active_name(), DEFAULT_CHARACTER_NAME);
        assert_eq!(
            session.persona().personality,
            session.roster().default_character().personality
        );
        assert!(!session.roster().contains("Pirate"));
    }

    #[test]
    fn persona_edits_shape_the_prompt() {
        let mut session = Session::default();
        session.set_persona_name("Eliza");
        session.set_persona_personality("A Rogerian therapist");

        let pending = session.begin_turn("I feel sad").unwrap();
        assert!(pending.prompt().starts_with("You are Eliza. A Rogerian therapist\n\n"));
        assert!(pending.prompt().ends_with("\nEliza:"));
        // the roster entry is untouched
        assert_eq!(
            session.roster().default_character().personality,
            crate::character::DEFAULT_PERSONALITY
        );
    }

    #[tokio::test]
    async fn refresh_status_records_listing() {
        let backend = ScriptedBackend {
            models: vec!["llama2:latest".into()],
            ..Default::default()
        };
        let mut session = Session::default();

        let status = session.refresh_status(&backend).await;
        assert_eq!(status.to_string(), "✅ Connected - 1 models found");
        assert!(session.status().is_connected());
    }

    #[test]
    fn persona_changes_are_refused_while_a_reply_is_pending() {
        let mut session = Session::default();
        session.create_character(&draft("Pirate", "Says arr")).unwrap();
        let pending = session.begin_turn("I love treasure").unwrap();

        assert!(matches!(session.switch_character(DEFAULT_CHARACTER_NAME), Err(ChatError::Busy)));
        assert!(matches!(session.clear_chat(), Err(ChatError::Busy)));
        assert!(matches!(session.delete_character("Pirate"), Err(ChatError::Busy)));
        assert!(matches!(session.create_character(&draft("Sage", "")), Err(ChatError::Busy)));
        assert_eq!(session.active_name(), "Pirate");
        assert_eq!(session.messages().len(), 2);

        session.complete_turn(pending, Ok("Arr, treasure!".into()));
        session.switch_character(DEFAULT_CHARACTER_NAME).unwrap();

        // the pirate's exchange stays with the pirate's conversation
        assert_eq!(session.messages().len(), 1);
        assert!(session.turns().is_empty());
        let next = session.begin_turn("hello").unwrap();
        assert!(!next.prompt().contains("Recent conversation"));
    }

    #[test]
    fn manual_memory_is_trimmed_and_capped() {
        let mut session = Session::default();
        session.add_memory("  User has a cat named Miso ").unwrap();
        assert_eq!(
            session.memory().iter().next().map(|f| f.text.as_str()),
            Some("User has a cat named Miso")
        );

        for i in 0..30 {
            session.add_memory(&format!("fact {}", i)).unwrap();
        }
        assert_eq!(session.memory().len(), MEMORY_CAPACITY);
        assert_eq!(session.memory().iter().next().map(|f| f.text.as_str()), Some("fact 10"));
    }

    #[test]
    fn blank_manual_memory_is_rejected() {
        let mut session = Session::default();
        let err = session.add_memory("   ").unwrap_err();
        assert!(matches!(err, ChatError::Validation(msg) if msg == "Enter a fact"));
        assert!(session.memory().is_empty());
    }

    #[test]
    fn auto_memory_off_skips_extraction_but_keeps_history() {
        let mut session = Session::default();
        assert!(session.auto_memory());
        session.set_auto_memory(false);

        let pending = session.begin_turn("My name is Alex").unwrap();
        session.complete_turn(pending, Ok("Hi Alex".into()));
        assert!(session.memory().is_empty());
        assert_eq!(session.turns().len(), 1);

        session.set_auto_memory(true);
        let pending = session.begin_turn("I love jazz").unwrap();
        session.complete_turn(pending, Ok("Nice".into()));
        assert_eq!(
            session.memory().iter().map(|f| f.text.as_str()).collect::<Vec<_>>(),
            vec!["User likes jazz"]
        );
    }
}
