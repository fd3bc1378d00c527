use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crate::app::{ApiService, App};
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
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Status(status) => app.api_status = Some(status),
        AppEvent::Voice(voice_event) => app.on_voice_event(voice_event),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.show_api_key_input {
        handle_api_key_input(app, key);
        return;
    }
    if app.show_service_picker {
        handle_service_picker(app, key);
        return;
    }
    if app.show_action_picker {
        handle_action_picker(app, key);
        return;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('w') => app.toggle_wikipedia_mode(),
            KeyCode::Char('t') => app.toggle_tts(),
            KeyCode::Char('v') => app.voice.toggle_capture(),
            KeyCode::Char('l') => app.clear_log(),
            KeyCode::Char('k') => app.open_service_picker(),
            KeyCode::Char('a') => app.open_action_picker(),
            _ => {}
        }
        return;
    }

    match key.code {
        // Quick actions
        KeyCode::F(2) => app.request_daily_plan(),
        KeyCode::F(3) => app.request_daily_briefing(),
        KeyCode::F(4) => app.request_insights(),
        KeyCode::F(5) => app.request_agent_status(),

        // Send
        KeyCode::Enter => app.send_current_input(),

        // Discard current input
        KeyCode::Esc => {
            app.input.clear();
            app.input_cursor = 0;
        }

        // Chat log scrolling
        KeyCode::Up => app.scroll_up(),
        KeyCode::Down => app.scroll_down(),
        KeyCode::PageUp => {
            for _ in 0..(app.chat_height / 2).max(1) {
                app.scroll_up();
            }
        }
        KeyCode::PageDown => {
            for _ in 0..(app.chat_height / 2).max(1) {
                app.scroll_down();
            }
        }

        // Input editing
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.input_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.input_cursor = 0;
        }
        KeyCode::End => {
            app.input_cursor = app.input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
            app.input.insert(byte_pos, c);
            app.input_cursor += 1;
        }
        _ => {}
    }
}

fn handle_service_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_popups(),
        KeyCode::Char('j') | KeyCode::Down => {
            let i = app.service_picker_state.selected().unwrap_or(0);
            let last = ApiService::ALL.len() - 1;
            app.service_picker_state.select(Some((i + 1).min(last)));
        }
        KeyCode::Char('k') | KeyCode::Up => {
            let i = app.service_picker_state.selected().unwrap_or(0);
            app.service_picker_state.select(Some(i.saturating_sub(1)));
        }
        KeyCode::Enter => app.pick_service(),
        _ => {}
    }
}

fn handle_action_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_popups(),
        KeyCode::Char('j') | KeyCode::Down => {
            let i = app.action_picker_state.selected().unwrap_or(0);
            let last = app.agent_actions.len().saturating_sub(1);
            app.action_picker_state.select(Some((i + 1).min(last)));
        }
        KeyCode::Char('k') | KeyCode::Up => {
            let i = app.action_picker_state.selected().unwrap_or(0);
            app.action_picker_state.select(Some(i.saturating_sub(1)));
        }
        KeyCode::Enter => app.pick_action(),
        _ => {}
    }
}

fn handle_api_key_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_popups(),
        KeyCode::Enter => app.submit_api_key(),
        KeyCode::Backspace => {
            if app.api_key_cursor > 0 {
                app.api_key_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.api_key_input, app.api_key_cursor);
                app.api_key_input.remove(byte_pos);
            }
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.api_key_input, app.api_key_cursor);
            app.api_key_input.insert(byte_pos, c);
            app.api_key_cursor += 1;
        }
        KeyCode::Left => {
            app.api_key_cursor = app.api_key_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.api_key_input.chars().count();
            app.api_key_cursor = (app.api_key_cursor + 1).min(char_count);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::envelope::AgentAction;

    fn test_app() -> App {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        App::new(Config::new(), tx)
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn test_typing_inserts_at_cursor() {
        let mut app = test_app();
        for c in "hexlo".chars() {
            handle_key(&mut app, press(KeyCode::Char(c)));
        }
        handle_key(&mut app, press(KeyCode::Left));
        handle_key(&mut app, press(KeyCode::Left));
        handle_key(&mut app, press(KeyCode::Left));
        handle_key(&mut app, press(KeyCode::Delete));
        handle_key(&mut app, press(KeyCode::Char('l')));
        assert_eq!(app.input, "hello");
    }

    #[test]
    fn test_escape_clears_input() {
        let mut app = test_app();
        handle_key(&mut app, press(KeyCode::Char('x')));
        handle_key(&mut app, press(KeyCode::Esc));
        assert!(app.input.is_empty());
        assert_eq!(app.input_cursor, 0);
    }

    #[test]
    fn test_ctrl_c_quits() {
        let mut app = test_app();
        handle_key(&mut app, ctrl('c'));
        assert!(app.should_quit);
    }

    #[test]
    fn test_ctrl_w_toggles_wikipedia_mode() {
        let mut app = test_app();
        handle_key(&mut app, ctrl('w'));
        assert!(app.wikipedia_mode);
        handle_key(&mut app, ctrl('w'));
        assert!(!app.wikipedia_mode);
    }

    #[test]
    fn test_service_picker_keys() {
        let mut app = test_app();
        handle_key(&mut app, ctrl('k'));
        assert!(app.show_service_picker);
        handle_key(&mut app, press(KeyCode::Down));
        handle_key(&mut app, press(KeyCode::Enter));
        assert!(app.show_api_key_input);
        assert_eq!(app.api_key_service, Some(ApiService::News));

        for c in "secret".chars() {
            handle_key(&mut app, press(KeyCode::Char(c)));
        }
        assert_eq!(app.api_key_input, "secret");
        handle_key(&mut app, press(KeyCode::Esc));
        assert!(!app.show_api_key_input);
    }

    #[tokio::test]
    async fn test_action_picker_keys() {
        let mut app = test_app();
        app.agent_actions = vec![
            AgentAction {
                action_id: "a1".to_string(),
                description: "first action".to_string(),
                priority: 2,
            },
            AgentAction {
                action_id: "a2".to_string(),
                description: "second action".to_string(),
                priority: 6,
            },
        ];

        handle_key(&mut app, ctrl('a'));
        assert!(app.show_action_picker);
        handle_key(&mut app, press(KeyCode::Down));
        handle_key(&mut app, press(KeyCode::Enter));
        assert!(!app.show_action_picker);
        assert!(app.pending.is_some());
    }

    #[test]
    fn test_utf8_editing_is_char_based() {
        let mut app = test_app();
        for c in "héllo".chars() {
            handle_key(&mut app, press(KeyCode::Char(c)));
        }
        handle_key(&mut app, press(KeyCode::Home));
        handle_key(&mut app, press(KeyCode::Right));
        handle_key(&mut app, press(KeyCode::Backspace));
        assert_eq!(app.input, "éllo");
    }
}
