use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use crate::app::{ApiService, App, MessageSender};
use crate::envelope::ServiceState;
use crate::voice::VoiceState;

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

    let [chat_column, sidebar_area] =
        Layout::horizontal([Constraint::Min(0), Constraint::Length(30)]).areas(body_area);

    let [messages_area, input_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(chat_column);

    render_messages(app, frame, messages_area);
    render_input(app, frame, input_area);
    render_sidebar(app, frame, sidebar_area);

    render_footer(app, frame, footer_area);

    // Popups (in order of priority)
    if app.show_api_key_input {
        render_api_key_input(app, frame, area);
    } else if app.show_service_picker {
        render_service_picker(app, frame, area);
    } else if app.show_action_picker {
        render_action_picker(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let mut spans = vec![
        Span::styled(" Nova Assistant ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ];

    if !app.voice.supported() {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            " voice unavailable ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        ));
    }
    if app.wikipedia_mode {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            " WIKIPEDIA MODE ",
            Style::default().fg(Color::Black).bg(Color::Cyan),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_messages(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Conversation ");

    let inner = block.inner(area);
    // Record geometry for wrap-aware scroll math
    app.chat_height = inner.height;
    app.chat_width = inner.width;

    let mut lines: Vec<Line> = Vec::new();
    for msg in &app.messages {
        let header = match msg.sender {
            MessageSender::User => Line::from(vec![
                Span::styled("You", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
                Span::styled(
                    format!("  {}", msg.timestamp),
                    Style::default().fg(Color::DarkGray),
                ),
            ]),
            MessageSender::Nova => Line::from(vec![
                Span::styled(
                    "Nova",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("  {}", msg.timestamp),
                    Style::default().fg(Color::DarkGray),
                ),
            ]),
        };
        lines.push(header);
        lines.extend(msg.fragment.lines.iter().cloned());
        lines.push(Line::default());
    }

    if app.is_loading() {
        lines.push(Line::from(Span::styled(
            "Nova",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Nova is thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let (title, border_color) = if app.voice_state() == VoiceState::Listening {
        (" Listening... ", Color::Red)
    } else if app.wikipedia_mode {
        (" Ask and I'll search Wikipedia ", Color::Cyan)
    } else {
        (" Message ", Color::Yellow)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Calculate visible portion of input with horizontal scrolling
    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;

    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);

    frame.render_widget(input, area);

    if !app.show_api_key_input && !app.show_service_picker && !app.show_action_picker {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn service_state_span(state: ServiceState) -> Span<'static> {
    let color = match state {
        ServiceState::Online => Color::Green,
        ServiceState::Offline => Color::Red,
        ServiceState::NoKey => Color::Yellow,
        ServiceState::Unknown => Color::DarkGray,
    };
    Span::styled(format!("● {}", state.label()), Style::default().fg(color))
}

fn render_sidebar(app: &App, frame: &mut Frame, area: Rect) {
    let [stats_area, status_area, toggles_area] = Layout::vertical([
        Constraint::Min(6),
        Constraint::Length(5),
        Constraint::Length(5),
    ])
    .areas(area);

    // Memory stats
    let stats_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Memory ");

    let stats_text = if app.stats_error {
        Text::from(Span::styled(
            "Error loading stats",
            Style::default().fg(Color::Red),
        ))
    } else if let Some(stats) = &app.stats {
        let mut lines = vec![Line::from(vec![
            Span::styled("Total entries: ", Style::default().bold()),
            Span::raw(stats.total_entries.to_string()),
        ])];
        if let Some(categories) = &stats.categories {
            if !categories.is_empty() {
                lines.push(Line::from(Span::styled(
                    "Categories:",
                    Style::default().bold(),
                )));
                for (category, count) in categories {
                    lines.push(Line::from(format!("  {} {}", category, count)));
                }
            }
        }
        if let Some(recent) = &stats.recent_activity {
            lines.push(Line::from(Span::styled("Recent:", Style::default().bold())));
            lines.push(Line::from(Span::styled(
                format!("  {}", recent),
                Style::default().fg(Color::DarkGray),
            )));
        }
        Text::from(lines)
    } else {
        Text::from(Span::styled(
            "Loading...",
            Style::default().fg(Color::DarkGray),
        ))
    };

    let stats = Paragraph::new(stats_text)
        .block(stats_block)
        .wrap(Wrap { trim: true });
    frame.render_widget(stats, stats_area);

    // External API status
    let status_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" External APIs ");

    let status = app.api_status.unwrap_or_default();
    let status_lines = vec![
        Line::from(vec![
            Span::raw("Wikipedia  "),
            service_state_span(status.wikipedia),
        ]),
        Line::from(vec![
            Span::raw("Weather    "),
            service_state_span(status.weather),
        ]),
        Line::from(vec![
            Span::raw("News       "),
            service_state_span(status.news),
        ]),
    ];
    frame.render_widget(
        Paragraph::new(Text::from(status_lines)).block(status_block),
        status_area,
    );

    // Session toggles
    let toggles_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Session ");

    let on = Style::default().fg(Color::Green);
    let off = Style::default().fg(Color::DarkGray);

    let voice_span = match app.voice_state() {
        VoiceState::Unsupported => Span::styled("unsupported", Style::default().fg(Color::Yellow)),
        VoiceState::Idle => Span::styled("idle", off),
        VoiceState::Listening => Span::styled("listening", Style::default().fg(Color::Red)),
    };

    let toggle_lines = vec![
        Line::from(vec![
            Span::raw("TTS        "),
            if app.tts_enabled {
                Span::styled("on", on)
            } else {
                Span::styled("off", off)
            },
        ]),
        Line::from(vec![
            Span::raw("Wikipedia  "),
            if app.wikipedia_mode {
                Span::styled("on", on)
            } else {
                Span::styled("off", off)
            },
        ]),
        Line::from(vec![Span::raw("Voice      "), voice_span]),
    ];
    frame.render_widget(
        Paragraph::new(Text::from(toggle_lines)).block(toggles_block),
        toggles_area,
    );
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = if app.show_api_key_input || app.show_service_picker || app.show_action_picker {
        vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" confirm ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" cancel ", label_style),
        ]
    } else {
        vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" ^V ", key_style),
            Span::styled(" voice ", label_style),
            Span::styled(" ^T ", key_style),
            Span::styled(" tts ", label_style),
            Span::styled(" ^W ", key_style),
            Span::styled(" wiki ", label_style),
            Span::styled(" F2-F5 ", key_style),
            Span::styled(" plan/brief/insights/agent ", label_style),
            Span::styled(" ^A ", key_style),
            Span::styled(" actions ", label_style),
            Span::styled(" ^K ", key_style),
            Span::styled(" api key ", label_style),
            Span::styled(" ^L ", key_style),
            Span::styled(" clear ", label_style),
            Span::styled(" ^C ", key_style),
            Span::styled(" quit ", label_style),
        ]
    };

    let footer = Paragraph::new(Line::from(hints));
    frame.render_widget(footer, area);
}

fn render_service_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let popup_width = 40.min(area.width.saturating_sub(4));
    let popup_height = (ApiService::ALL.len() as u16 + 2).min(area.height.saturating_sub(4));

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Set API Key For ");

    let items: Vec<ListItem> = ApiService::ALL
        .iter()
        .map(|service| ListItem::new(format!(" {} ", service.display_name())))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.service_picker_state);
}

fn render_action_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let popup_width = 56.min(area.width.saturating_sub(4));
    let popup_height = (app.agent_actions.len() as u16 + 2).min(area.height.saturating_sub(4));

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Execute Pending Action ");

    let items: Vec<ListItem> = app
        .agent_actions
        .iter()
        .map(|action| {
            ListItem::new(format!(
                " {} (priority {}/10) ",
                action.description, action.priority
            ))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.action_picker_state);
}

fn render_api_key_input(app: &App, frame: &mut Frame, area: Rect) {
    let service_name = app
        .api_key_service
        .map(|s| s.display_name())
        .unwrap_or("Service");

    // Calculate popup size and position (centered)
    let popup_width = 60.min(area.width.saturating_sub(4));
    let popup_height = 7;

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(format!(" Enter API Key for {} ", service_name));

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    // Instructions
    let instructions =
        Paragraph::new("Paste your API key below. Press Enter to save, Esc to cancel.")
            .style(Style::default().fg(Color::DarkGray));

    let instructions_area = Rect::new(inner.x, inner.y, inner.width, 1);
    frame.render_widget(instructions, instructions_area);

    // Input field
    let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 1);

    // Mask the key with asterisks, keeping the last 4 chars readable
    let display_text = if app.api_key_input.is_empty() {
        String::new()
    } else if app.api_key_input.chars().count() <= 4 {
        "*".repeat(app.api_key_input.chars().count())
    } else {
        let char_count = app.api_key_input.chars().count();
        let masked_len = char_count - 4;
        let last_four: String = app.api_key_input.chars().skip(masked_len).collect();
        format!("{}...{}", "*".repeat(masked_len.min(20)), last_four)
    };

    let input = Paragraph::new(display_text).style(Style::default().fg(Color::Cyan));
    frame.render_widget(input, input_area);

    // Show cursor
    let cursor_x = app.api_key_cursor.min(input_area.width as usize) as u16;
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));

    // Status line
    let char_count = format!("{} characters", app.api_key_input.chars().count());
    let status = Paragraph::new(char_count).style(Style::default().fg(Color::DarkGray));

    let status_area = Rect::new(inner.x, inner.y + 4, inner.width, 1);
    frame.render_widget(status, status_area);
}
