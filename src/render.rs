use ratatui::{
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
};
use crate::envelope::{DataPayload, ResponseEnvelope, ResponseKind};

/// Parse a line of assistant prose and convert **bold**, *italic* and #tag
/// tokens to styled spans. Unmatched markers fall back to literal text.
fn parse_prose_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.char_indices().peekable();
    let mut current_text = String::new();

    while let Some((_, c)) = chars.next() {
        if c == '*' {
            // Check for ** (bold)
            if chars.peek().map(|(_, c)| *c) == Some('*') {
                // Consume the second *
                chars.next();

                // Push any accumulated plain text
                if !current_text.is_empty() {
                    spans.push(Span::raw(std::mem::take(&mut current_text)));
                }

                // Find closing **
                let mut bold_text = String::new();
                let mut found_close = false;

                while let Some((_, c)) = chars.next() {
                    if c == '*' && chars.peek().map(|(_, c)| *c) == Some('*') {
                        chars.next(); // consume second *
                        found_close = true;
                        break;
                    }
                    bold_text.push(c);
                }

                if found_close && !bold_text.is_empty() {
                    spans.push(Span::styled(
                        bold_text,
                        Style::default().add_modifier(Modifier::BOLD),
                    ));
                } else {
                    // No closing **, treat as literal
                    current_text.push_str("**");
                    current_text.push_str(&bold_text);
                }
            } else {
                // Single * (italic) - scan for a closing single *
                let mut italic_text = String::new();
                let mut found_close = false;

                while let Some((_, c)) = chars.next() {
                    if c == '*' {
                        found_close = true;
                        break;
                    }
                    italic_text.push(c);
                }

                if found_close && !italic_text.is_empty() {
                    if !current_text.is_empty() {
                        spans.push(Span::raw(std::mem::take(&mut current_text)));
                    }
                    spans.push(Span::styled(
                        italic_text,
                        Style::default().add_modifier(Modifier::ITALIC),
                    ));
                } else {
                    current_text.push('*');
                    current_text.push_str(&italic_text);
                }
            }
        } else if c == '#' && chars.peek().map(|(_, c)| c.is_alphanumeric()).unwrap_or(false) {
            // #word becomes a tag badge
            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            let mut tag = String::from("#");
            while let Some((_, c)) = chars.peek() {
                if c.is_alphanumeric() || *c == '_' {
                    tag.push(*c);
                    chars.next();
                } else {
                    break;
                }
            }
            spans.push(tag_badge(tag));
        } else {
            current_text.push(c);
        }
    }

    // Push any remaining text
    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

fn tag_badge(tag: String) -> Span<'static> {
    Span::styled(tag, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
}

/// Pure transform of backend prose into display lines: newlines become line
/// breaks, emphasis and tag markers become styled spans.
pub fn format_text(text: &str) -> Vec<Line<'static>> {
    text.lines().map(parse_prose_line).collect()
}

/// Render text the user typed. No marker interpretation at all, so nothing
/// a user enters can activate styling or be mistaken for markup.
pub fn render_user_text(text: &str) -> Text<'static> {
    Text::from(
        text.lines()
            .map(|l| Line::from(Span::raw(l.to_string())))
            .collect::<Vec<_>>(),
    )
}

/// Render a response envelope into a display fragment.
///
/// Dispatches on the envelope kind; each arm is a pure function of the
/// payload. Missing payload fields degrade to a partial fragment, the main
/// text is always shown, and no arm can fail.
pub fn render_envelope(env: &ResponseEnvelope) -> Text<'static> {
    match env.kind {
        ResponseKind::Error => return Text::from(render_error(&env.response)),
        ResponseKind::Help => return Text::from(render_help(&env.response)),
        _ => {}
    }

    let mut lines = format_text(&env.response);

    let extra = match env.kind {
        ResponseKind::Knowledge => render_knowledge(env),
        ResponseKind::Weather => render_weather(env.data.as_ref()),
        ResponseKind::News => render_news(env),
        ResponseKind::DailyPlan => render_daily_plan(env),
        ResponseKind::DailyBriefing => render_daily_briefing(env.data.as_ref()),
        ResponseKind::Memory => render_memory(env),
        ResponseKind::AgentStatus => render_agent_status(env),
        ResponseKind::Insights => render_insights(env),
        _ => Vec::new(),
    };

    if !extra.is_empty() {
        lines.push(Line::default());
        lines.extend(extra);
    }

    Text::from(lines)
}

fn render_error(text: &str) -> Vec<Line<'static>> {
    text.lines()
        .map(|l| {
            Line::from(Span::styled(
                l.to_string(),
                Style::default().fg(Color::Red),
            ))
        })
        .collect()
}

fn render_help(text: &str) -> Vec<Line<'static>> {
    text.lines()
        .map(|l| {
            if let Some(rest) = l.trim_start().strip_prefix("• ") {
                Line::from(vec![
                    Span::styled("  ▸ ", Style::default().fg(Color::Cyan)),
                    Span::raw(rest.to_string()),
                ])
            } else {
                parse_prose_line(l)
            }
        })
        .collect()
}

fn heading(text: impl Into<String>) -> Line<'static> {
    Line::from(Span::styled(
        text.into(),
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    ))
}

fn dim(text: impl Into<String>) -> Span<'static> {
    Span::styled(text.into(), Style::default().fg(Color::DarkGray))
}

/// Format a numeric payload value the way the backend sent it (no trailing
/// ".0" for whole numbers).
fn fmt_num(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

fn render_knowledge(env: &ResponseEnvelope) -> Vec<Line<'static>> {
    let Some(title) = env.title.as_ref() else {
        return Vec::new();
    };

    let mut lines = vec![heading(format!("◆ {}", title))];

    let mut source_spans = vec![dim(format!(
        "Source: {}",
        env.source.as_deref().unwrap_or("unknown")
    ))];
    if let Some(url) = &env.url {
        source_spans.push(Span::raw("  "));
        source_spans.push(Span::styled(
            url.clone(),
            Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
        ));
    }
    lines.push(Line::from(source_spans));
    lines
}

fn render_weather(data: Option<&DataPayload>) -> Vec<Line<'static>> {
    let Some(weather) = data else {
        return Vec::new();
    };
    if weather.location.is_none() && weather.temperature.is_none() {
        return Vec::new();
    }

    let mut lines = Vec::new();

    let mut top = Vec::new();
    if let Some(location) = &weather.location {
        top.push(Span::styled(
            format!("⌂ {}", location),
            Style::default().fg(Color::Yellow).bold(),
        ));
    }
    if let Some(temp) = weather.temperature {
        top.push(Span::raw("  "));
        top.push(Span::styled(
            format!("{}°C", fmt_num(temp)),
            Style::default().fg(Color::Cyan).bold(),
        ));
    }
    if !top.is_empty() {
        lines.push(Line::from(top));
    }

    if let Some(description) = &weather.description {
        lines.push(Line::from(dim(description.clone())));
    }

    let mut details = Vec::new();
    if let Some(humidity) = weather.humidity {
        details.push(format!("Humidity: {}%", fmt_num(humidity)));
    }
    if let Some(wind) = weather.wind_speed {
        details.push(format!("Wind: {} m/s", fmt_num(wind)));
    }
    if !details.is_empty() {
        lines.push(Line::from(dim(details.join("   "))));
    }

    lines
}

fn render_news(env: &ResponseEnvelope) -> Vec<Line<'static>> {
    let Some(articles) = env.articles.as_ref() else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    for (i, article) in articles.iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(format!("{}. ", i + 1), Style::default().fg(Color::Cyan)),
            Span::styled(article.title.clone(), Style::default().bold()),
        ]));
        if let Some(source) = &article.source {
            lines.push(Line::from(dim(format!("   {}", source))));
        }
        if let Some(url) = &article.url {
            lines.push(Line::from(Span::styled(
                format!("   {}", url),
                Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
            )));
        }
    }
    lines
}

fn render_daily_plan(env: &ResponseEnvelope) -> Vec<Line<'static>> {
    let Some(plan) = env.plan.as_ref() else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    lines.push(heading(format!(
        "▣ Daily Plan for {}",
        plan.date.as_deref().unwrap_or("today")
    )));

    if let Some(weather) = &plan.weather {
        let temp = weather.temperature.map(fmt_num).unwrap_or_default();
        let desc = weather.description.clone().unwrap_or_default();
        lines.push(Line::from(vec![
            Span::styled("Weather: ", Style::default().bold()),
            Span::raw(format!("{}°C, {}", temp, desc)),
        ]));
    }

    if let Some(tasks) = plan.priority_tasks.as_ref().filter(|t| !t.is_empty()) {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "Priority Tasks:",
            Style::default().bold(),
        )));
        for task in tasks {
            lines.push(Line::from(format!("  □ {}", task.text)));
        }
    }

    if let Some(blocks) = plan.time_blocks.as_ref().filter(|b| !b.is_empty()) {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "Suggested Schedule:",
            Style::default().bold(),
        )));
        for block in blocks {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("  {} ", block.time),
                    Style::default().fg(Color::Cyan),
                ),
                Span::raw(block.task.clone()),
            ]));
        }
    }

    if let Some(suggestions) = plan.suggestions.as_ref().filter(|s| !s.is_empty()) {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "Suggestions:",
            Style::default().bold(),
        )));
        for suggestion in suggestions {
            lines.push(Line::from(dim(format!("  ◦ {}", suggestion))));
        }
    }

    lines
}

fn render_daily_briefing(data: Option<&DataPayload>) -> Vec<Line<'static>> {
    let Some(briefing) = data else {
        return Vec::new();
    };

    let mut lines = vec![heading("▣ Daily Briefing")];

    if let Some(weather) = &briefing.weather {
        let temp = weather.temperature.map(fmt_num).unwrap_or_default();
        lines.push(Line::from(vec![
            Span::styled("Weather  ", Style::default().bold()),
            Span::raw(format!(
                "{}°C, {} in {}",
                temp,
                weather.description.as_deref().unwrap_or(""),
                weather.location.as_deref().unwrap_or(""),
            )),
        ]));
    }

    if let Some(headlines) = briefing.news_headlines.as_ref().filter(|h| !h.is_empty()) {
        lines.push(Line::from(Span::styled(
            "Top Headlines",
            Style::default().bold(),
        )));
        for (i, article) in headlines.iter().enumerate() {
            lines.push(Line::from(format!("  {}. {}", i + 1, article.title)));
        }
    }

    if let Some(tasks) = briefing.tasks_today.as_ref().filter(|t| !t.is_empty()) {
        lines.push(Line::from(Span::styled(
            "Today's Tasks",
            Style::default().bold(),
        )));
        lines.push(Line::from(format!(
            "  {} tasks scheduled for today.",
            tasks.len()
        )));
    }

    lines
}

fn category_color(category: &str) -> Color {
    match category {
        "task" => Color::Yellow,
        "idea" => Color::Cyan,
        "reminder" => Color::Red,
        "note" => Color::Gray,
        "recurring_reminder" => Color::Blue,
        "uncategorized" => Color::DarkGray,
        _ => Color::Gray,
    }
}

fn render_memory(env: &ResponseEnvelope) -> Vec<Line<'static>> {
    let Some(entries) = env.entries.as_ref() else {
        return Vec::new();
    };

    let mut lines = Vec::new();

    if let Some(summary) = &env.summary {
        lines.push(Line::from(vec![
            Span::styled("Summary: ", Style::default().fg(Color::Cyan).bold()),
            Span::raw(summary.clone()),
        ]));
        lines.push(Line::default());
    }

    for entry in entries {
        let mut header = vec![
            Span::styled(
                format!("[{}]", entry.category),
                Style::default()
                    .fg(category_color(&entry.category))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" "),
            dim(entry.timestamp.clone()),
        ];
        if let Some(due) = &entry.due_date {
            header.push(dim(format!("  Due: {}", due)));
        }
        if let Some(recurring) = &entry.recurring {
            header.push(dim(format!("  Recurring: {}", recurring)));
        }
        lines.push(Line::from(header));

        lines.push(Line::from(format!("  {}", entry.text)));

        if !entry.tags.is_empty() {
            let mut tag_spans = vec![Span::raw("  ")];
            for tag in &entry.tags {
                tag_spans.push(tag_badge(format!("#{}", tag)));
                tag_spans.push(Span::raw(" "));
            }
            lines.push(Line::from(tag_spans));
        }
        lines.push(Line::default());
    }

    // Trailing blank is noise after the last entry
    if lines.last().map(|l| l.spans.is_empty()).unwrap_or(false) {
        lines.pop();
    }

    lines
}

/// Priority buckets for pending agent actions.
fn priority_bucket(priority: u8) -> (&'static str, Color) {
    if priority > 7 {
        ("high", Color::Red)
    } else if priority > 4 {
        ("medium", Color::Yellow)
    } else {
        ("low", Color::Green)
    }
}

fn render_agent_status(env: &ResponseEnvelope) -> Vec<Line<'static>> {
    let Some(status) = env.status.as_ref() else {
        return Vec::new();
    };

    let mut lines = vec![heading("⚙ Agent Status")];

    lines.push(Line::from(vec![
        Span::styled("Active: ", Style::default().bold()),
        Span::raw(if status.is_active { "Yes" } else { "No" }),
    ]));
    lines.push(Line::from(vec![
        Span::styled("Pending Actions: ", Style::default().bold()),
        Span::raw(status.pending_actions.to_string()),
    ]));
    lines.push(Line::from(vec![
        Span::styled("Recent Insights: ", Style::default().bold()),
        Span::raw(status.recent_insights.to_string()),
    ]));

    if !status.actions.is_empty() {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "Pending Actions:",
            Style::default().bold(),
        )));
        for action in &status.actions {
            let (bucket, color) = priority_bucket(action.priority);
            lines.push(Line::from(vec![
                Span::styled("  ◆ ", Style::default().fg(color)),
                Span::styled(action.description.clone(), Style::default().bold()),
            ]));
            lines.push(Line::from(dim(format!(
                "    Priority: {}/10 ({})",
                action.priority, bucket
            ))));
        }
    }

    lines
}

fn render_insights(env: &ResponseEnvelope) -> Vec<Line<'static>> {
    let Some(insights) = env.insights.as_ref() else {
        return Vec::new();
    };

    let mut lines = vec![heading("◇ Recent Insights")];

    if insights.is_empty() {
        lines.push(Line::from(dim(
            "No insights available yet. Keep using Nova to generate insights!",
        )));
        return lines;
    }

    for insight in insights {
        lines.push(Line::from(Span::styled(
            insight.title.clone(),
            Style::default().bold(),
        )));
        lines.push(Line::from(format!("  {}", insight.description)));
        lines.push(Line::from(dim(format!(
            "  Confidence: {}%",
            (insight.confidence * 100.0).round() as i64
        ))));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{AgentAction, AgentStatus, Insight, MemoryEntry, NewsArticle};

    /// Flatten a fragment to a plain string for presence checks.
    fn flat(text: &Text<'_>) -> String {
        text.lines
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|s| s.content.as_ref())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn env_from_json(raw: &str) -> ResponseEnvelope {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn test_bold_becomes_emphasis_span() {
        let line = parse_prose_line("say **hello** now");
        let bold: Vec<_> = line
            .spans
            .iter()
            .filter(|s| s.style.add_modifier.contains(Modifier::BOLD))
            .collect();
        assert_eq!(bold.len(), 1);
        assert_eq!(bold[0].content.as_ref(), "hello");
    }

    #[test]
    fn test_italic_becomes_emphasis_span() {
        let line = parse_prose_line("a *quiet* word");
        let italic: Vec<_> = line
            .spans
            .iter()
            .filter(|s| s.style.add_modifier.contains(Modifier::ITALIC))
            .collect();
        assert_eq!(italic.len(), 1);
        assert_eq!(italic[0].content.as_ref(), "quiet");
    }

    #[test]
    fn test_unmatched_markers_stay_literal() {
        let line = parse_prose_line("odd **marker here");
        let joined: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(joined, "odd **marker here");

        let line = parse_prose_line("lonely * star");
        let joined: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(joined, "lonely * star");
    }

    #[test]
    fn test_hash_token_becomes_tag_badge() {
        let line = parse_prose_line("tagged #groceries today");
        let tags: Vec<_> = line
            .spans
            .iter()
            .filter(|s| s.style.fg == Some(Color::Cyan))
            .collect();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].content.as_ref(), "#groceries");
    }

    #[test]
    fn test_format_text_splits_lines() {
        let lines = format_text("one\ntwo\nthree");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_user_text_is_never_interpreted() {
        let text = render_user_text("<script>alert(1)</script> **not bold** #nottag");
        let rendered = flat(&text);
        assert!(rendered.contains("<script>alert(1)</script>"));
        assert!(rendered.contains("**not bold**"));
        // Every span is unstyled raw text
        for line in &text.lines {
            for span in &line.spans {
                assert_eq!(span.style, Style::default());
            }
        }
    }

    #[test]
    fn test_knowledge_fragment_contains_payload_fields() {
        let env = env_from_json(
            r#"{"response":"Here's what I found","type":"knowledge",
                "title":"Rust","source":"wikipedia","url":"https://en.wikipedia.org/wiki/Rust"}"#,
        );
        let out = flat(&render_envelope(&env));
        assert!(out.contains("Here's what I found"));
        assert!(out.contains("Rust"));
        assert!(out.contains("wikipedia"));
        assert!(out.contains("https://en.wikipedia.org/wiki/Rust"));
    }

    #[test]
    fn test_knowledge_without_title_degrades_to_text_only() {
        let env = env_from_json(r#"{"response":"plain answer","type":"knowledge"}"#);
        let out = flat(&render_envelope(&env));
        assert_eq!(out, "plain answer");
    }

    #[test]
    fn test_weather_fragment_contains_payload_fields() {
        let env = env_from_json(
            r#"{"response":"It's mild","type":"weather",
                "data":{"location":"Lisbon","description":"clear sky",
                        "temperature":21.5,"humidity":46,"wind_speed":3.2}}"#,
        );
        let out = flat(&render_envelope(&env));
        assert!(out.contains("Lisbon"));
        assert!(out.contains("clear sky"));
        assert!(out.contains("21.5°C"));
        assert!(out.contains("46%"));
        assert!(out.contains("3.2 m/s"));
    }

    #[test]
    fn test_weather_without_data_degrades() {
        let env = env_from_json(r#"{"response":"no data","type":"weather"}"#);
        let out = flat(&render_envelope(&env));
        assert_eq!(out, "no data");
    }

    #[test]
    fn test_news_fragment_numbers_articles() {
        let env = ResponseEnvelope {
            response: "Headlines".into(),
            kind: ResponseKind::News,
            articles: Some(vec![
                NewsArticle {
                    title: "First story".into(),
                    source: Some("Reuters".into()),
                    url: Some("https://example.com/1".into()),
                },
                NewsArticle {
                    title: "Second story".into(),
                    source: None,
                    url: None,
                },
            ]),
            ..Default::default()
        };
        let out = flat(&render_envelope(&env));
        assert!(out.contains("1. First story"));
        assert!(out.contains("Reuters"));
        assert!(out.contains("2. Second story"));
    }

    #[test]
    fn test_daily_plan_fragment() {
        let env = env_from_json(
            r#"{"response":"Your plan","type":"daily_plan",
                "plan":{"date":"2026-08-30",
                        "weather":{"temperature":19,"description":"cloudy"},
                        "priority_tasks":[{"text":"ship release"}],
                        "time_blocks":[{"time":"09:00","task":"standup"}],
                        "suggestions":["take a walk"]}}"#,
        );
        let out = flat(&render_envelope(&env));
        assert!(out.contains("2026-08-30"));
        assert!(out.contains("19°C"));
        assert!(out.contains("ship release"));
        assert!(out.contains("09:00"));
        assert!(out.contains("standup"));
        assert!(out.contains("take a walk"));
    }

    #[test]
    fn test_briefing_fragment() {
        let env = env_from_json(
            r#"{"response":"Good morning","type":"daily_briefing",
                "data":{"weather":{"location":"Lisbon","description":"rain","temperature":14},
                        "news_headlines":[{"title":"Markets up"}],
                        "tasks_today":[1,2]}}"#,
        );
        let out = flat(&render_envelope(&env));
        assert!(out.contains("Lisbon"));
        assert!(out.contains("1. Markets up"));
        assert!(out.contains("2 tasks scheduled"));
    }

    #[test]
    fn test_memory_fragment_shows_entries_and_tags() {
        let env = ResponseEnvelope {
            response: "Found entries".into(),
            kind: ResponseKind::Memory,
            summary: Some("Mostly errands".into()),
            entries: Some(vec![MemoryEntry {
                category: "task".into(),
                timestamp: "2026-08-29 10:00".into(),
                text: "buy milk".into(),
                tags: vec!["groceries".into()],
                due_date: Some("2026-08-31".into()),
                recurring: None,
            }]),
            ..Default::default()
        };
        let out = flat(&render_envelope(&env));
        assert!(out.contains("Mostly errands"));
        assert!(out.contains("[task]"));
        assert!(out.contains("buy milk"));
        assert!(out.contains("#groceries"));
        assert!(out.contains("Due: 2026-08-31"));
    }

    #[test]
    fn test_agent_status_fragment_and_priority_buckets() {
        let env = ResponseEnvelope {
            response: "Status".into(),
            kind: ResponseKind::AgentStatus,
            status: Some(AgentStatus {
                is_active: true,
                pending_actions: 2,
                recent_insights: 1,
                actions: vec![
                    AgentAction {
                        action_id: "a1".into(),
                        description: "urgent thing".into(),
                        priority: 9,
                    },
                    AgentAction {
                        action_id: "a2".into(),
                        description: "later thing".into(),
                        priority: 3,
                    },
                ],
            }),
            ..Default::default()
        };
        let out = flat(&render_envelope(&env));
        assert!(out.contains("Active: Yes"));
        assert!(out.contains("Pending Actions: 2"));
        assert!(out.contains("urgent thing"));
        assert!(out.contains("9/10 (high)"));
        assert!(out.contains("3/10 (low)"));
    }

    #[test]
    fn test_priority_bucket_boundaries() {
        assert_eq!(priority_bucket(8).0, "high");
        assert_eq!(priority_bucket(7).0, "medium");
        assert_eq!(priority_bucket(5).0, "medium");
        assert_eq!(priority_bucket(4).0, "low");
    }

    #[test]
    fn test_insights_fragment_and_empty_placeholder() {
        let env = ResponseEnvelope {
            response: "Insights".into(),
            kind: ResponseKind::Insights,
            insights: Some(vec![Insight {
                title: "Morning focus".into(),
                description: "You finish more tasks before noon".into(),
                confidence: 0.87,
            }]),
            ..Default::default()
        };
        let out = flat(&render_envelope(&env));
        assert!(out.contains("Morning focus"));
        assert!(out.contains("87%"));

        let empty = ResponseEnvelope {
            response: "Insights".into(),
            kind: ResponseKind::Insights,
            insights: Some(vec![]),
            ..Default::default()
        };
        let out = flat(&render_envelope(&empty));
        assert!(out.contains("No insights available yet"));
    }

    #[test]
    fn test_error_fragment_is_styled() {
        let env = ResponseEnvelope::error("Connection error. Please try again.");
        let text = render_envelope(&env);
        let out = flat(&text);
        assert!(out.contains("Connection error"));
        assert_eq!(text.lines[0].spans[0].style.fg, Some(Color::Red));
    }

    #[test]
    fn test_help_bullets_get_chevrons() {
        let env = ResponseEnvelope::plain(
            "Things I can do:\n• check the weather\n• read the news",
            ResponseKind::Help,
        );
        let out = flat(&render_envelope(&env));
        assert!(out.contains("▸ check the weather"));
        assert!(out.contains("▸ read the news"));
    }

    #[test]
    fn test_every_kind_renders_with_empty_payload() {
        // No kind may panic when its payload is absent.
        for kind in [
            ResponseKind::Plain,
            ResponseKind::Knowledge,
            ResponseKind::Weather,
            ResponseKind::News,
            ResponseKind::DailyPlan,
            ResponseKind::DailyBriefing,
            ResponseKind::Memory,
            ResponseKind::AgentStatus,
            ResponseKind::Insights,
            ResponseKind::Error,
            ResponseKind::Help,
            ResponseKind::Success,
            ResponseKind::System,
            ResponseKind::VoiceSuccess,
        ] {
            let env = ResponseEnvelope::plain("text", kind);
            let out = flat(&render_envelope(&env));
            assert!(out.contains("text"));
        }
    }
}
