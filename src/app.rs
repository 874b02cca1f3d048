use std::sync::Arc;

use ratatui::widgets::ListState;
use tokio::task::JoinHandle;

use eliza_core::ai::Backend;
use eliza_core::character::CharacterDraft;
use eliza_core::error::ChatError;
use eliza_core::status::{self, BackendStatus};
use eliza_core::{PendingTurn, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Chat,
    Settings,
    Memory,
    Characters,
    Backend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    CharacterName,
    Personality,
    EndpointUrl,
    Model,
    Temperature,
    MaxTokens,
}

impl SettingsField {
    pub fn all() -> [SettingsField; 6] {
        [
            SettingsField::CharacterName,
            SettingsField::Personality,
            SettingsField::EndpointUrl,
            SettingsField::Model,
            SettingsField::Temperature,
            SettingsField::MaxTokens,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            SettingsField::CharacterName => "Character Name",
            SettingsField::Personality => "Personality",
            SettingsField::EndpointUrl => "Ollama URL",
            SettingsField::Model => "Model",
            SettingsField::Temperature => "Temperature",
            SettingsField::MaxTokens => "Max Tokens",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Personality,
    Backstory,
    Avatar,
}

impl FormField {
    pub fn all() -> [FormField; 4] {
        [FormField::Name, FormField::Personality, FormField::Backstory, FormField::Avatar]
    }

    pub fn label(&self) -> &'static str {
        match self {
            FormField::Name => "Name",
            FormField::Personality => "Personality",
            FormField::Backstory => "Backstory",
            FormField::Avatar => "Avatar",
        }
    }

    pub fn next(self) -> Self {
        match self {
            FormField::Name => FormField::Personality,
            FormField::Personality => FormField::Backstory,
            FormField::Backstory => FormField::Avatar,
            FormField::Avatar => FormField::Name,
        }
    }
}

/// Generation request running in the background
pub struct ReplyTask {
    pub pending: PendingTurn,
    pub handle: JoinHandle<Result<String, ChatError>>,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub panel: Panel,
    pub input_mode: InputMode,
    pub session: Session,
    pub backend: Arc<dyn Backend>,

    // Chat input
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Chat view
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations

    // Background work
    pub reply_task: Option<ReplyTask>,
    pub status_task: Option<JoinHandle<BackendStatus>>,

    // Backend panel
    pub model_state: ListState,

    // Settings panel
    pub settings_state: ListState,
    pub settings_buffer: String,

    // Memory panel
    pub memory_buffer: String,

    // Character panel
    pub character_state: ListState,
    pub form: CharacterDraft,
    pub form_field: FormField,
    pub show_form: bool,

    // Modal notice (validation errors, confirmations)
    pub notice: Option<String>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(session: Session, backend: Arc<dyn Backend>) -> Self {
        let mut settings_state = ListState::default();
        settings_state.select(Some(0));
        let mut character_state = ListState::default();
        character_state.select(Some(0));

        Self {
            should_quit: false,
            panel: Panel::Chat,
            input_mode: InputMode::Editing,
            session,
            backend,

            input: String::new(),
            cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            reply_task: None,
            status_task: None,

            model_state: ListState::default(),

            settings_state,
            settings_buffer: String::new(),

            memory_buffer: String::new(),

            character_state,
            form: CharacterDraft::default(),
            form_field: FormField::Name,
            show_form: false,

            notice: None,

            animation_frame: 0,
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.session.is_busy()
    }

    // Chat
    /// Send the input line as a new turn. Ignored while a reply is pending.
    pub fn submit_input(&mut self) {
        if self.is_waiting() || self.input.trim().is_empty() {
            return;
        }

        let pending = match self.session.begin_turn(&self.input) {
            Ok(pending) => pending,
            Err(err) => {
                self.notice = Some(err.to_string());
                return;
            }
        };

        self.input.clear();
        self.cursor = 0;
        self.scroll_chat_to_bottom();

        let backend = Arc::clone(&self.backend);
        let config = self.session.config().clone();
        let prompt = pending.prompt().to_string();
        let handle = tokio::spawn(async move { backend.generate(&prompt, &config).await });
        self.reply_task = Some(ReplyTask { pending, handle });
    }

    /// Collect finished background work into the session.
    pub async fn poll_tasks(&mut self) {
        if self.reply_task.as_ref().is_some_and(|t| t.handle.is_finished()) {
            if let Some(task) = self.reply_task.take() {
                let outcome = task
                    .handle
                    .await
                    .unwrap_or_else(|e| Err(ChatError::Transport(e.to_string())));
                self.session.complete_turn(task.pending, outcome);
                self.scroll_chat_to_bottom();
            }
        }

        if self.status_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(handle) = self.status_task.take() {
                let status = handle.await.unwrap_or(BackendStatus::Disconnected);
                let current = status
                    .models()
                    .iter()
                    .position(|m| m == &self.session.config().model_name);
                let selected = current.or_else(|| (!status.models().is_empty()).then_some(0));
                self.model_state.select(selected);
                self.session.record_status(status);
            }
        }
    }

    pub fn clear_chat(&mut self) {
        match self.session.clear_chat() {
            Ok(()) => self.chat_scroll = 0,
            Err(err) => self.notice = Some(err.to_string()),
        }
    }

    // Backend diagnostics
    pub fn start_status_check(&mut self) {
        if self.status_task.is_some() {
            return;
        }
        self.session.record_status(BackendStatus::Checking);
        let backend = Arc::clone(&self.backend);
        let config = self.session.config().clone();
        self.status_task = Some(tokio::spawn(async move {
            status::check_backend(backend.as_ref(), &config).await
        }));
    }

    pub fn model_nav(&mut self, down: bool) {
        let len = self.session.status().models().len();
        if len == 0 {
            return;
        }
        let i = self.model_state.selected().unwrap_or(0);
        let next = if down { (i + 1).min(len - 1) } else { i.saturating_sub(1) };
        self.model_state.select(Some(next));
    }

    /// Use the highlighted model from the last listing for future turns.
    pub fn select_model(&mut self) {
        let chosen = self
            .model_state
            .selected()
            .and_then(|i| self.session.status().models().get(i).cloned());
        if let Some(model) = chosen {
            self.session.config_mut().set_model(&model);
        }
    }

    // Settings
    pub fn selected_setting(&self) -> SettingsField {
        let fields = SettingsField::all();
        fields[self.settings_state.selected().unwrap_or(0).min(fields.len() - 1)]
    }

    pub fn setting_value(&self, field: SettingsField) -> String {
        let persona = self.session.persona();
        let config = self.session.config();
        match field {
            SettingsField::CharacterName => persona.name.clone(),
            SettingsField::Personality => persona.personality.clone(),
            SettingsField::EndpointUrl => config.endpoint_url.clone(),
            SettingsField::Model => config.model_name.clone(),
            SettingsField::Temperature => format!("{:.1}", config.temperature),
            SettingsField::MaxTokens => config.max_response_tokens.to_string(),
        }
    }

    pub fn begin_setting_edit(&mut self) {
        self.settings_buffer = self.setting_value(self.selected_setting());
        self.input_mode = InputMode::Editing;
    }

    /// Apply the edit buffer to the selected field. Numbers out of range are
    /// clamped, unparseable numbers are rejected with a notice.
    pub fn commit_setting_edit(&mut self) {
        let value = std::mem::take(&mut self.settings_buffer);
        self.input_mode = InputMode::Normal;

        match self.selected_setting() {
            SettingsField::CharacterName => self.session.set_persona_name(value.trim()),
            SettingsField::Personality => self.session.set_persona_personality(value.trim()),
            SettingsField::EndpointUrl => self.session.config_mut().set_endpoint(&value),
            SettingsField::Model => self.session.config_mut().set_model(&value),
            SettingsField::Temperature => match value.trim().parse::<f32>() {
                Ok(t) => self.session.config_mut().set_temperature(t),
                Err(_) => self.notice = Some(format!("Not a number: {}", value.trim())),
            },
            SettingsField::MaxTokens => match value.trim().parse::<u32>() {
                Ok(n) => self.session.config_mut().set_max_tokens(n),
                Err(_) => self.notice = Some(format!("Not a whole number: {}", value.trim())),
            },
        }
    }

    /// Nudge a numeric setting up or down by one step.
    pub fn adjust_setting(&mut self, up: bool) {
        let field = self.selected_setting();
        let config = self.session.config_mut();
        match field {
            SettingsField::Temperature => {
                let step = if up { 0.1 } else { -0.1 };
                let next = ((config.temperature + step) * 10.0).round() / 10.0;
                config.set_temperature(next);
            }
            SettingsField::MaxTokens => {
                let next = if up {
                    config.max_response_tokens.saturating_add(50)
                } else {
                    config.max_response_tokens.saturating_sub(50)
                };
                config.set_max_tokens(next);
            }
            _ => {}
        }
    }

    pub fn settings_nav(&mut self, down: bool) {
        let len = SettingsField::all().len();
        let i = self.settings_state.selected().unwrap_or(0);
        let next = if down { (i + 1).min(len - 1) } else { i.saturating_sub(1) };
        self.settings_state.select(Some(next));
    }

    // Memory
    pub fn begin_memory_edit(&mut self) {
        self.memory_buffer.clear();
        self.input_mode = InputMode::Editing;
    }

    /// Store the typed fact. A blank fact keeps the editor open with a notice.
    pub fn commit_memory(&mut self) {
        match self.session.add_memory(&self.memory_buffer) {
            Ok(()) => {
                self.memory_buffer.clear();
                self.input_mode = InputMode::Normal;
            }
            Err(err) => self.notice = Some(err.to_string()),
        }
    }

    pub fn toggle_auto_memory(&mut self) {
        let enabled = !self.session.auto_memory();
        self.session.set_auto_memory(enabled);
    }

    // Characters
    pub fn character_names(&self) -> Vec<String> {
        self.session.roster().list().iter().map(|c| c.name.clone()).collect()
    }

    pub fn selected_character(&self) -> Option<String> {
        let names = self.character_names();
        self.character_state.selected().and_then(|i| names.get(i).cloned())
    }

    pub fn character_nav(&mut self, down: bool) {
        let len = self.session.roster().len();
        let i = self.character_state.selected().unwrap_or(0);
        let next = if down { (i + 1).min(len - 1) } else { i.saturating_sub(1) };
        self.character_state.select(Some(next));
    }

    pub fn switch_to_selected(&mut self) {
        let Some(name) = self.selected_character() else {
            return;
        };
        match self.session.switch_character(&name) {
            Ok(()) => {
                self.chat_scroll = 0;
                self.panel = Panel::Chat;
                self.input_mode = InputMode::Editing;
            }
            Err(err) => self.notice = Some(err.to_string()),
        }
    }

    pub fn delete_selected(&mut self) {
        let Some(name) = self.selected_character() else {
            return;
        };
        match self.session.delete_character(&name) {
            Ok(()) => {
                let len = self.session.roster().len();
                let i = self.character_state.selected().unwrap_or(0);
                self.character_state.select(Some(i.min(len - 1)));
            }
            Err(err) => self.notice = Some(err.to_string()),
        }
    }

    pub fn open_form(&mut self) {
        self.form = CharacterDraft::default();
        self.form_field = FormField::Name;
        self.show_form = true;
        self.input_mode = InputMode::Editing;
    }

    pub fn form_value_mut(&mut self) -> &mut String {
        match self.form_field {
            FormField::Name => &mut self.form.name,
            FormField::Personality => &mut self.form.personality,
            FormField::Backstory => &mut self.form.backstory,
            FormField::Avatar => &mut self.form.avatar,
        }
    }

    pub fn form_value(&self, field: FormField) -> &str {
        match field {
            FormField::Name => &self.form.name,
            FormField::Personality => &self.form.personality,
            FormField::Backstory => &self.form.backstory,
            FormField::Avatar => &self.form.avatar,
        }
    }

    /// Create the character from the form. On a validation error the form
    /// stays open with its contents so the user can fix it.
    pub fn submit_form(&mut self) {
        match self.session.create_character(&self.form) {
            Ok(character) => {
                self.notice = Some(format!("✅ Character \"{}\" created!", character.name));
                self.form = CharacterDraft::default();
                self.form_field = FormField::Name;
                self.show_form = false;
                self.input_mode = InputMode::Normal;
            }
            Err(err) => self.notice = Some(err.to_string()),
        }
    }

    pub fn tick_animation(&mut self) {
        if self.is_waiting() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Scroll chat to bottom so the newest message (or "typing...") is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in self.session.messages() {
            total_lines = total_lines.saturating_add(1); // Author line
            for line in msg.text.lines() {
                let char_count = line.chars().count();
                total_lines = total_lines.saturating_add((char_count / wrap_width) as u16 + 1);
            }
            total_lines = total_lines.saturating_add(1); // Blank line after message
        }

        if self.is_waiting() {
            total_lines = total_lines.saturating_add(2);
        }

        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };

        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eliza_core::OllamaClient;

    fn app() -> App {
        App::new(Session::default(), Arc::new(OllamaClient::new()))
    }

    #[test]
    fn blank_form_keeps_contents_and_reports() {
        let mut app = app();
        app.open_form();
        app.form.personality = "Grumpy".to_string();

        app.submit_form();

        assert!(app.show_form);
        assert_eq!(app.form.personality, "Grumpy");
        assert_eq!(app.notice.as_deref(), Some("Please enter a character name"));
    }

    #[test]
    fn deleting_default_shows_notice() {
        let mut app = app();
        app.character_state.select(Some(0));

        app.delete_selected();

        assert_eq!(app.notice.as_deref(), Some("Cannot delete the default character"));
        assert_eq!(app.session.roster().len(), 1);
    }

    #[test]
    fn temperature_steps_stay_in_range() {
        let mut app = app();
        app.settings_state.select(Some(4));
        for _ in 0..30 {
            app.adjust_setting(true);
        }
        assert_eq!(app.session.config().temperature, 2.0);
    }

    #[test]
    fn bad_number_is_rejected() {
        let mut app = app();
        app.settings_state.select(Some(5));
        app.settings_buffer = "lots".to_string();

        app.commit_setting_edit();

        assert_eq!(app.session.config().max_response_tokens, 200);
        assert!(app.notice.is_some());
    }

    #[test]
    fn switch_while_waiting_shows_busy_notice() {
        let mut app = app();
        app.session.create_character(&CharacterDraft {
            name: "Pirate".to_string(),
            ..Default::default()
        }).unwrap();
        let _pending = app.session.begin_turn("ahoy").unwrap();
        app.character_state.select(Some(0));

        app.switch_to_selected();
        app.delete_selected();

        assert_eq!(app.notice.as_deref(), Some("A reply is already being generated"));
        assert_eq!(app.session.active_name(), "Pirate");
        assert_eq!(app.session.roster().len(), 2);
    }

    #[test]
    fn blank_memory_keeps_editor_open() {
        let mut app = app();
        app.panel = Panel::Memory;
        app.begin_memory_edit();
        app.memory_buffer = "  ".to_string();

        app.commit_memory();
        assert_eq!(app.input_mode, InputMode::Editing);
        assert_eq!(app.notice.as_deref(), Some("Enter a fact"));

        app.notice = None;
        app.memory_buffer = "User plays chess".to_string();
        app.commit_memory();
        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.session.memory().len(), 1);
    }
}
