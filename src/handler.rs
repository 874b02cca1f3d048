use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use crate::app::{App, InputMode, Panel};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => app.scroll_chat_to_bottom(),
        AppEvent::Tick => app.tick_animation(),
    }
    app.poll_tasks().await;
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // A notice blocks everything until dismissed
    if app.notice.is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
            app.notice = None;
        }
        return;
    }

    match (app.panel, app.input_mode) {
        (Panel::Chat, InputMode::Editing) => handle_chat_editing(app, key),
        (Panel::Settings, InputMode::Editing) => handle_settings_editing(app, key),
        (Panel::Characters, InputMode::Editing) => handle_form_editing(app, key),
        (Panel::Memory, InputMode::Editing) => handle_memory_editing(app, key),
        (_, InputMode::Editing) => app.input_mode = InputMode::Normal,
        (panel, InputMode::Normal) => handle_normal(app, panel, key),
    }
}

fn handle_normal(app: &mut App, panel: Panel, key: KeyEvent) {
    // Panel switching and quitting work from every panel
    match key.code {
        KeyCode::Char('q') => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('S') => {
            app.panel = Panel::Settings;
            return;
        }
        KeyCode::Char('M') => {
            app.panel = Panel::Memory;
            return;
        }
        KeyCode::Char('C') => {
            app.panel = Panel::Characters;
            return;
        }
        KeyCode::Char('B') => {
            app.panel = Panel::Backend;
            app.start_status_check();
            return;
        }
        KeyCode::Esc if panel != Panel::Chat => {
            app.panel = Panel::Chat;
            app.input_mode = InputMode::Editing;
            return;
        }
        _ => {}
    }

    match panel {
        Panel::Chat => handle_chat_normal(app, key),
        Panel::Settings => handle_settings_normal(app, key),
        Panel::Memory => match key.code {
            KeyCode::Char('a') | KeyCode::Enter => app.begin_memory_edit(),
            KeyCode::Char('t') => app.toggle_auto_memory(),
            KeyCode::Char('d') => app.session.clear_memories(),
            _ => {}
        },
        Panel::Characters => handle_characters_normal(app, key),
        Panel::Backend => match key.code {
            KeyCode::Char('r') => app.start_status_check(),
            KeyCode::Char('j') | KeyCode::Down => app.model_nav(true),
            KeyCode::Char('k') | KeyCode::Up => app.model_nav(false),
            KeyCode::Enter => app.select_model(),
            _ => {}
        },
    }
}

fn handle_chat_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('i') | KeyCode::Enter => {
            app.input_mode = InputMode::Editing;
            app.cursor = app.input.chars().count();
        }
        KeyCode::Char('x') => app.clear_chat(),
        KeyCode::Char('j') | KeyCode::Down => app.chat_scroll = app.chat_scroll.saturating_add(1),
        KeyCode::Char('k') | KeyCode::Up => app.chat_scroll = app.chat_scroll.saturating_sub(1),
        KeyCode::Char('g') => app.chat_scroll = 0,
        KeyCode::Char('G') => app.scroll_chat_to_bottom(),
        _ => {}
    }
}

fn handle_chat_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Enter => app.submit_input(),
        KeyCode::PageUp => app.chat_scroll = app.chat_scroll.saturating_sub(app.chat_height / 2),
        KeyCode::PageDown => app.chat_scroll = app.chat_scroll.saturating_add(app.chat_height / 2),
        _ => edit_line(&mut app.input, &mut app.cursor, key),
    }
}

/// Cursor-aware single line editing shared by the chat input
fn edit_line(text: &mut String, cursor: &mut usize, key: KeyEvent) {
    match key.code {
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if *cursor < text.chars().count() {
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Left => *cursor = cursor.saturating_sub(1),
        KeyCode::Right => *cursor = (*cursor + 1).min(text.chars().count()),
        KeyCode::Home => *cursor = 0,
        KeyCode::End => *cursor = text.chars().count(),
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(text, *cursor);
            text.insert(byte_pos, c);
            *cursor += 1;
        }
        _ => {}
    }
}

fn handle_settings_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.settings_nav(true),
        KeyCode::Char('k') | KeyCode::Up => app.settings_nav(false),
        KeyCode::Enter => app.begin_setting_edit(),
        KeyCode::Char('+') | KeyCode::Char('l') | KeyCode::Right => app.adjust_setting(true),
        KeyCode::Char('-') | KeyCode::Char('h') | KeyCode::Left => app.adjust_setting(false),
        _ => {}
    }
}

fn handle_settings_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.settings_buffer.clear();
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => app.commit_setting_edit(),
        KeyCode::Backspace => {
            app.settings_buffer.pop();
        }
        KeyCode::Char(c) => app.settings_buffer.push(c),
        _ => {}
    }
}

fn handle_memory_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.memory_buffer.clear();
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => app.commit_memory(),
        KeyCode::Backspace => {
            app.memory_buffer.pop();
        }
        KeyCode::Char(c) => app.memory_buffer.push(c),
        _ => {}
    }
}

fn handle_characters_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.character_nav(true),
        KeyCode::Char('k') | KeyCode::Up => app.character_nav(false),
        KeyCode::Enter => app.switch_to_selected(),
        KeyCode::Char('d') => app.delete_selected(),
        KeyCode::Char('n') => app.open_form(),
        _ => {}
    }
}

fn handle_form_editing(app: &mut App, key: KeyEvent) {
    if !app.show_form {
        app.input_mode = InputMode::Normal;
        return;
    }
    match key.code {
        KeyCode::Esc => {
            app.show_form = false;
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Tab => app.form_field = app.form_field.next(),
        KeyCode::Enter => app.submit_form(),
        KeyCode::Backspace => {
            app.form_value_mut().pop();
        }
        KeyCode::Char(c) => app.form_value_mut().push(c),
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.panel != Panel::Chat {
        return;
    }
    match mouse.kind {
        MouseEventKind::ScrollDown => app.chat_scroll = app.chat_scroll.saturating_add(3),
        MouseEventKind::ScrollUp => app.chat_scroll = app.chat_scroll.saturating_sub(3),
        _ => {}
    }
}
