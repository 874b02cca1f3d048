use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use crate::app::{App, FormField, InputMode, Panel, SettingsField};

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    // Side panel opens to the left of the chat, like a sidebar
    let chat_area = if app.panel == Panel::Chat {
        body_area
    } else {
        let [side_area, chat_area] = Layout::horizontal([
            Constraint::Length(42),
            Constraint::Min(0),
        ])
        .areas(body_area);

        match app.panel {
            Panel::Settings => render_settings(app, frame, side_area),
            Panel::Memory => render_memory(app, frame, side_area),
            Panel::Characters => render_characters(app, frame, side_area),
            Panel::Backend => render_backend(app, frame, side_area),
            Panel::Chat => {}
        }
        chat_area
    };

    render_chat(app, frame, chat_area);
    render_footer(app, frame, footer_area);

    if app.notice.is_some() {
        render_notice(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let persona = app.session.persona();

    let state = if app.is_waiting() { "typing..." } else { "Online" };

    let title = Line::from(vec![
        Span::styled(format!(" {} {} ", persona.avatar, persona.name), Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::styled(format!("({}) ", state), Style::default().fg(Color::Green)),
        Span::styled(
            format!("{} memories ", app.session.memory().len()),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::Black));
    frame.render_widget(header, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let [messages_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = messages_area.height.saturating_sub(2);
    app.chat_width = messages_area.width.saturating_sub(2);

    let bot_name = app.session.persona().name.clone();
    let config = app.session.config();
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if app.panel == Panel::Chat { Color::Cyan } else { Color::DarkGray }))
        .title(format!(" Ollama: {} ", config.model_name));

    let mut lines: Vec<Line> = Vec::new();
    for msg in app.session.messages() {
        let (author, color) = if msg.is_from_bot {
            (bot_name.as_str(), Color::Yellow)
        } else {
            ("You", Color::Cyan)
        };
        lines.push(Line::from(vec![
            Span::styled(author.to_string(), Style::default().fg(color).add_modifier(Modifier::BOLD)),
            Span::styled(format!("  {}", msg.time_label()), Style::default().fg(Color::DarkGray)),
        ]));
        for line in msg.text.lines() {
            lines.push(Line::from(line.to_string()));
        }
        lines.push(Line::default());
    }

    if app.is_waiting() {
        lines.push(Line::from(Span::styled(
            bot_name.clone(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("typing{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, messages_area);

    // Input box - disabled look while a reply is outstanding
    let editing = app.panel == Panel::Chat && app.input_mode == InputMode::Editing;
    let border_color = if app.is_waiting() {
        Color::DarkGray
    } else if editing {
        Color::Yellow
    } else {
        Color::Gray
    };
    let title = if app.is_waiting() { " Waiting for reply... " } else { " Type your message... " };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Keep the cursor visible with horizontal scrolling
    let inner_width = input_area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width == 0 || app.cursor < inner_width {
        0
    } else {
        app.cursor - inner_width + 1
    };
    let visible_text: String = app.input.chars().skip(scroll_offset).take(inner_width).collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);
    frame.render_widget(input, input_area);

    if editing && app.notice.is_none() {
        let cursor_x = (app.cursor - scroll_offset) as u16;
        frame.set_cursor_position((input_area.x + cursor_x + 1, input_area.y + 1));
    }
}

fn panel_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title)
}

fn highlight() -> Style {
    Style::default()
        .bg(Color::Blue)
        .fg(Color::White)
        .add_modifier(Modifier::BOLD)
}

fn render_settings(app: &mut App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let selected = app.selected_setting();

    let items: Vec<ListItem> = SettingsField::all()
        .iter()
        .map(|field| {
            let value = if editing && *field == selected {
                format!("{}_", app.settings_buffer)
            } else {
                app.setting_value(*field)
            };
            ListItem::new(vec![
                Line::from(Span::styled(field.label(), Style::default().fg(Color::DarkGray))),
                Line::from(format!("  {}", value)),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(panel_block(" Settings "))
        .highlight_style(if editing {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            highlight()
        })
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.settings_state);
}

fn render_memory(app: &App, frame: &mut Frame, area: Rect) {
    let [list_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    let memory = app.session.memory();
    let auto = if app.session.auto_memory() { "auto" } else { "manual" };
    let title = format!(" Memory ({}/{}, {}) ", memory.len(), memory.capacity(), auto);

    if memory.is_empty() {
        let placeholder = Paragraph::new("No memories yet. Share facts about yourself!")
            .style(Style::default().fg(Color::DarkGray))
            .wrap(Wrap { trim: true })
            .block(panel_block(&title));
        frame.render_widget(placeholder, list_area);
    } else {
        let items: Vec<ListItem> = memory
            .iter()
            .map(|fact| {
                ListItem::new(vec![
                    Line::from(fact.text.clone()),
                    Line::from(Span::styled(
                        fact.timestamp.format("%Y-%m-%d %H:%M").to_string(),
                        Style::default().fg(Color::DarkGray),
                    )),
                ])
            })
            .collect();
        frame.render_widget(List::new(items).block(panel_block(&title)), list_area);
    }

    let editing = app.input_mode == InputMode::Editing;
    let (text, color) = if editing {
        (format!("{}_", app.memory_buffer), Color::Yellow)
    } else {
        ("press a to add a fact".to_string(), Color::DarkGray)
    };
    let input = Paragraph::new(text)
        .style(Style::default().fg(color))
        .block(panel_block(" Add Memory "));
    frame.render_widget(input, input_area);
}

fn render_characters(app: &mut App, frame: &mut Frame, area: Rect) {
    if app.show_form {
        render_character_form(app, frame, area);
        return;
    }

    let active = app.session.active_name().to_string();
    let items: Vec<ListItem> = app
        .session
        .roster()
        .list()
        .iter()
        .map(|c| {
            let style = if c.name == active {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let personality: String = c.personality.chars().take(36).collect();
            ListItem::new(vec![
                Line::from(format!("{} {}", c.avatar, c.name)).style(style),
                Line::from(Span::styled(format!("   {}", personality), Style::default().fg(Color::DarkGray))),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(panel_block(" Characters "))
        .highlight_style(highlight())
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.character_state);
}

fn render_character_form(app: &App, frame: &mut Frame, area: Rect) {
    let mut lines = Vec::new();
    for field in FormField::all() {
        let active = field == app.form_field;
        let label_style = if active {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        lines.push(Line::from(Span::styled(field.label(), label_style)));
        let cursor = if active { "_" } else { "" };
        lines.push(Line::from(format!("  {}{}", app.form_value(field), cursor)));
        lines.push(Line::default());
    }

    let form = Paragraph::new(Text::from(lines))
        .wrap(Wrap { trim: false })
        .block(panel_block(" New Character "));
    frame.render_widget(form, area);
}

fn render_backend(app: &mut App, frame: &mut Frame, area: Rect) {
    let [status_area, models_area] = Layout::vertical([
        Constraint::Length(5),
        Constraint::Min(0),
    ])
    .areas(area);

    let status = app.session.status();
    let status_color = if status.is_connected() { Color::Green } else { Color::Red };
    let summary = Paragraph::new(vec![
        Line::from(Span::styled(status.to_string(), Style::default().fg(status_color))),
        Line::from(Span::styled(
            app.session.config().endpoint_url.clone(),
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .wrap(Wrap { trim: true })
    .block(panel_block(" Backend Status "));
    frame.render_widget(summary, status_area);

    let current = app.session.config().model_name.clone();
    let items: Vec<ListItem> = status
        .models()
        .iter()
        .map(|model| {
            let style = if *model == current {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!(" {} ", model)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(panel_block(" Available Models "))
        .highlight_style(highlight())
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, models_area, &mut app.model_state);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.panel {
        Panel::Chat => " CHAT ",
        Panel::Settings => " SETTINGS ",
        Panel::Memory => " MEMORY ",
        Panel::Characters => " CHARACTERS ",
        Panel::Backend => " BACKEND ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let pairs: &[(&str, &str)] = match (app.panel, app.input_mode) {
        (Panel::Chat, InputMode::Editing) => &[("Enter", "send"), ("Esc", "menu")],
        (Panel::Settings, InputMode::Editing) => &[("Enter", "apply"), ("Esc", "cancel")],
        (Panel::Characters, InputMode::Editing) => &[("Tab", "next field"), ("Enter", "create"), ("Esc", "cancel")],
        (Panel::Memory, InputMode::Editing) => &[("Enter", "remember"), ("Esc", "cancel")],
        (Panel::Chat, InputMode::Normal) => &[
            ("i", "type"), ("j/k", "scroll"), ("x", "clear chat"), ("S", "settings"),
            ("M", "memory"), ("C", "characters"), ("B", "backend"), ("q", "quit"),
        ],
        (Panel::Settings, InputMode::Normal) => &[
            ("j/k", "nav"), ("Enter", "edit"), ("+/-", "adjust"), ("Esc", "close"),
        ],
        (Panel::Memory, InputMode::Normal) => &[
            ("a", "add fact"), ("t", "toggle auto"), ("d", "clear memories"), ("Esc", "close"),
        ],
        (Panel::Characters, InputMode::Normal) => &[
            ("j/k", "nav"), ("Enter", "switch"), ("n", "new"), ("d", "delete"), ("Esc", "close"),
        ],
        (Panel::Backend, InputMode::Normal) => &[
            ("r", "recheck"), ("j/k", "nav"), ("Enter", "use model"), ("Esc", "close"),
        ],
        (_, InputMode::Editing) => &[],
    };

    let hints = pairs.iter().flat_map(|(key, label)| {
        [
            Span::styled(format!(" {} ", key), key_style),
            Span::styled(format!(" {} ", label), label_style),
        ]
    });

    let footer_content = Line::from(
        vec![Span::styled(mode_text, mode_style), Span::styled(" ", label_style)]
            .into_iter()
            .chain(hints)
            .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_notice(app: &App, frame: &mut Frame, area: Rect) {
    let message = app.notice.as_deref().unwrap_or_default();

    // Calculate popup size and position (centered)
    let popup_width = 50.min(area.width.saturating_sub(4));
    let popup_height = 5;

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Notice (Enter to dismiss) ");

    let notice = Paragraph::new(message)
        .wrap(Wrap { trim: true })
        .block(block);
    frame.render_widget(notice, popup_area);
}
