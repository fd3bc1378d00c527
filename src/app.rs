use chrono::Local;
use ratatui::text::Text;
use ratatui::widgets::ListState;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use crate::api::NovaClient;
use crate::config::Config;
use crate::envelope::{AgentAction, ExternalStatus, MemoryStats, ResponseEnvelope, ResponseKind};
use crate::poller;
use crate::render;
use crate::tui::AppEvent;
use crate::voice::{self, VoiceController, VoiceEvent, VoiceState};

const WELCOME_TEXT: &str =
    "Hi! I'm Nova. Ask me anything - knowledge, weather, news, or manage your tasks.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSender {
    User,
    Nova,
}

/// One displayed conversation turn. Immutable once appended; only a full
/// log clear removes entries.
pub struct Message {
    pub sender: MessageSender,
    pub text: String,
    pub timestamp: String,
    pub kind: ResponseKind,
    pub fragment: Text<'static>,
}

/// Which request a pending background task belongs to, so its reply (or
/// failure) gets the right follow-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestSource {
    Chat,
    DailyPlan,
    DailyBriefing,
    Insights,
    AgentStatus,
    AgentAction,
}

pub struct PendingRequest {
    pub source: RequestSource,
    pub task: JoinHandle<anyhow::Result<ResponseEnvelope>>,
}

/// Services the user can submit an API key for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiService {
    Weather,
    News,
}

impl ApiService {
    pub const ALL: [ApiService; 2] = [ApiService::Weather, ApiService::News];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApiService::Weather => "weather",
            ApiService::News => "news",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ApiService::Weather => "Weather",
            ApiService::News => "News",
        }
    }
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub config: Config,
    pub client: NovaClient,
    event_tx: UnboundedSender<AppEvent>,

    // Message log (append-only; cleared back to the welcome placeholder)
    pub messages: Vec<Message>,
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,

    // Input state
    pub input: String,
    pub input_cursor: usize,

    // Session flags
    pub wikipedia_mode: bool,
    pub tts_enabled: bool,

    // Voice
    pub voice: VoiceController,

    // Sidebar data
    pub stats: Option<MemoryStats>,
    pub stats_error: bool,
    pub api_status: Option<ExternalStatus>,

    // Background work
    pub pending: Option<PendingRequest>,
    pub stats_task: Option<JoinHandle<anyhow::Result<MemoryStats>>>,
    pub key_task: Option<JoinHandle<(ApiService, anyhow::Result<()>)>>,

    // API key popup
    pub show_service_picker: bool,
    pub service_picker_state: ListState,
    pub show_api_key_input: bool,
    pub api_key_input: String,
    pub api_key_cursor: usize,
    pub api_key_service: Option<ApiService>,

    // Agent actions (from the latest agent-status reply)
    pub agent_actions: Vec<AgentAction>,
    pub show_action_picker: bool,
    pub action_picker_state: ListState,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(config: Config, event_tx: UnboundedSender<AppEvent>) -> Self {
        let client = NovaClient::new(&config.base_url);
        let voice = VoiceController::new(
            voice::detect_recognizer(),
            voice::detect_synthesizer(),
            config.recognition_lang.clone(),
            config.speech,
        );
        let tts_enabled = config.tts_enabled;

        let mut app = Self {
            should_quit: false,
            config,
            client,
            event_tx,

            messages: Vec::new(),
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            input: String::new(),
            input_cursor: 0,

            wikipedia_mode: false,
            tts_enabled,

            voice,

            stats: None,
            stats_error: false,
            api_status: None,

            pending: None,
            stats_task: None,
            key_task: None,

            show_service_picker: false,
            service_picker_state: ListState::default(),
            show_api_key_input: false,
            api_key_input: String::new(),
            api_key_cursor: 0,
            api_key_service: None,

            agent_actions: Vec::new(),
            show_action_picker: false,
            action_picker_state: ListState::default(),

            animation_frame: 0,
        };

        app.push_nova_text(WELCOME_TEXT, ResponseKind::Plain);
        app
    }

    fn now_timestamp() -> String {
        Local::now().format("%H:%M").to_string()
    }

    // ---- message log -----------------------------------------------------

    pub fn push_user_message(&mut self, text: &str) {
        self.messages.push(Message {
            sender: MessageSender::User,
            text: text.to_string(),
            timestamp: Self::now_timestamp(),
            kind: ResponseKind::Plain,
            fragment: render::render_user_text(text),
        });
        self.scroll_to_bottom();
    }

    fn push_nova_text(&mut self, text: &str, kind: ResponseKind) {
        self.push_envelope(ResponseEnvelope::plain(text, kind));
    }

    pub fn push_error(&mut self, text: impl Into<String>) {
        self.push_envelope(ResponseEnvelope::error(text));
    }

    /// Append a rendered backend reply and run its side channels: speech
    /// output and, for memory-modifying kinds, a stats refresh.
    pub fn push_envelope(&mut self, env: ResponseEnvelope) {
        let speak = env.should_speak || env.kind == ResponseKind::VoiceSuccess;
        let refresh = matches!(env.kind, ResponseKind::Success | ResponseKind::System);

        if env.kind == ResponseKind::AgentStatus {
            if let Some(status) = &env.status {
                self.agent_actions = status.actions.clone();
            }
        }

        self.messages.push(Message {
            sender: MessageSender::Nova,
            text: env.response.clone(),
            timestamp: Self::now_timestamp(),
            kind: env.kind,
            fragment: render::render_envelope(&env),
        });
        self.scroll_to_bottom();

        if speak && self.tts_enabled {
            self.voice.speak(&env.response);
        }
        if refresh {
            self.refresh_stats();
        }
    }

    /// Truncate the log back to the initial welcome placeholder.
    pub fn clear_log(&mut self) {
        self.messages.truncate(1);
        self.chat_scroll = 0;
    }

    // ---- send path -------------------------------------------------------

    /// Normalize raw input for sending. Returns `(display, outbound)`: the
    /// text shown in the log and the text actually posted, which differ when
    /// Wikipedia mode rewrites the query. Whitespace-only input yields
    /// nothing. Wikipedia mode deactivates once its rewrite is applied.
    pub fn prepare_outgoing(&mut self, raw: &str) -> Option<(String, String)> {
        let display = raw.trim().to_string();
        if display.is_empty() {
            return None;
        }

        let lower = display.to_lowercase();
        let outbound = if self.wikipedia_mode
            && !lower.starts_with("wikipedia:")
            && !lower.starts_with("wiki:")
        {
            // The mode is spent only when the rewrite actually applied
            self.wikipedia_mode = false;
            format!("wikipedia: {}", display)
        } else {
            display.clone()
        };

        Some((display, outbound))
    }

    /// Submit a chat message. No-op for blank input or while a request is
    /// already in flight.
    pub fn send_message(&mut self, raw: &str) {
        if self.pending.is_some() {
            return;
        }
        let Some((display, outbound)) = self.prepare_outgoing(raw) else {
            return;
        };

        self.push_user_message(&display);

        let client = self.client.clone();
        self.pending = Some(PendingRequest {
            source: RequestSource::Chat,
            task: tokio::spawn(async move { client.chat(&outbound).await }),
        });
    }

    /// Submit the input buffer. The buffer survives untouched while a
    /// request is still in flight.
    pub fn send_current_input(&mut self) {
        if self.pending.is_some() {
            return;
        }
        let raw = std::mem::take(&mut self.input);
        self.input_cursor = 0;
        self.send_message(&raw);
    }

    fn spawn_request<F>(&mut self, source: RequestSource, fut: F)
    where
        F: std::future::Future<Output = anyhow::Result<ResponseEnvelope>> + Send + 'static,
    {
        if self.pending.is_some() {
            return;
        }
        self.pending = Some(PendingRequest {
            source,
            task: tokio::spawn(fut),
        });
    }

    pub fn request_daily_plan(&mut self) {
        let client = self.client.clone();
        self.spawn_request(RequestSource::DailyPlan, async move {
            client.daily_plan().await
        });
    }

    pub fn request_daily_briefing(&mut self) {
        let client = self.client.clone();
        self.spawn_request(RequestSource::DailyBriefing, async move {
            client.agent_action("daily_briefing_request").await
        });
    }

    pub fn request_insights(&mut self) {
        let client = self.client.clone();
        self.spawn_request(RequestSource::Insights, async move {
            client.insights().await
        });
    }

    pub fn request_agent_status(&mut self) {
        let client = self.client.clone();
        self.spawn_request(RequestSource::AgentStatus, async move {
            client.agent_status().await
        });
    }

    pub fn execute_agent_action(&mut self, action_id: String) {
        let client = self.client.clone();
        self.spawn_request(RequestSource::AgentAction, async move {
            client.agent_action(&action_id).await
        });
    }

    // ---- background task completion --------------------------------------

    /// Drain finished background tasks. Called once per loop iteration.
    pub async fn poll_tasks(&mut self) {
        if self.pending.as_ref().is_some_and(|p| p.task.is_finished()) {
            if let Some(pending) = self.pending.take() {
                let outcome = pending.task.await.unwrap_or_else(|e| {
                    Err(anyhow::anyhow!("request task failed: {}", e))
                });
                self.handle_reply(pending.source, outcome);
            }
        }

        if self.stats_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.stats_task.take() {
                match task.await {
                    Ok(Ok(stats)) => {
                        self.stats = Some(stats);
                        self.stats_error = false;
                    }
                    _ => self.stats_error = true,
                }
            }
        }

        if self.key_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.key_task.take() {
                if let Ok((service, outcome)) = task.await {
                    self.handle_key_saved(service, outcome);
                }
            }
        }
    }

    fn handle_reply(&mut self, source: RequestSource, outcome: anyhow::Result<ResponseEnvelope>) {
        match (source, outcome) {
            (RequestSource::Chat, Ok(env)) => self.push_envelope(env),
            (RequestSource::Chat, Err(e)) => {
                if e.downcast_ref::<reqwest::Error>().is_some() {
                    self.push_error("Connection error. Please try again.");
                } else {
                    self.push_error(e.to_string());
                }
            }
            (RequestSource::AgentAction, Ok(env)) => {
                self.push_envelope(env);
                // Pending-action list likely changed
                self.request_agent_status();
            }
            (RequestSource::DailyBriefing, Err(_)) => {
                // Agent action route unavailable; ask through plain chat
                self.send_message("daily briefing");
            }
            (_, Ok(env)) => self.push_envelope(env),
            (_, Err(e)) => self.push_error(e.to_string()),
        }
    }

    fn handle_key_saved(&mut self, service: ApiService, outcome: anyhow::Result<()>) {
        match outcome {
            Ok(()) => {
                self.push_nova_text(
                    &format!(
                        "{} API key saved successfully! You can now use {} features.",
                        service.display_name(),
                        service.as_str()
                    ),
                    ResponseKind::Success,
                );
                poller::refresh_once(self.client.clone(), self.event_tx.clone());
            }
            Err(e) => self.push_error(format!("Error saving API key: {}", e)),
        }
    }

    // ---- API key popup ---------------------------------------------------

    pub fn open_service_picker(&mut self) {
        self.show_service_picker = true;
        self.service_picker_state.select(Some(0));
    }

    pub fn pick_service(&mut self) {
        if let Some(i) = self.service_picker_state.selected() {
            if let Some(&service) = ApiService::ALL.get(i) {
                self.api_key_service = Some(service);
                self.show_service_picker = false;
                self.show_api_key_input = true;
                self.api_key_input.clear();
                self.api_key_cursor = 0;
            }
        }
    }

    pub fn submit_api_key(&mut self) {
        let key = self.api_key_input.trim().to_string();
        let Some(service) = self.api_key_service else {
            return;
        };
        if key.is_empty() {
            return;
        }

        self.show_api_key_input = false;
        self.api_key_input.clear();
        self.api_key_service = None;

        let client = self.client.clone();
        self.key_task = Some(tokio::spawn(async move {
            let outcome = client.save_api_key(service.as_str(), &key).await;
            (service, outcome)
        }));
    }

    pub fn close_popups(&mut self) {
        self.show_service_picker = false;
        self.show_api_key_input = false;
        self.api_key_input.clear();
        self.api_key_service = None;
        self.show_action_picker = false;
    }

    // ---- agent action picker ---------------------------------------------

    /// Open the pending-actions popup. Does nothing until an agent-status
    /// reply has supplied actions to pick from.
    pub fn open_action_picker(&mut self) {
        if self.agent_actions.is_empty() {
            return;
        }
        self.show_action_picker = true;
        self.action_picker_state.select(Some(0));
    }

    pub fn pick_action(&mut self) {
        if let Some(i) = self.action_picker_state.selected() {
            if let Some(action) = self.agent_actions.get(i) {
                let action_id = action.action_id.clone();
                self.show_action_picker = false;
                self.execute_agent_action(action_id);
            }
        }
    }

    // ---- toggles ---------------------------------------------------------

    pub fn toggle_tts(&mut self) {
        self.tts_enabled = !self.tts_enabled;
    }

    pub fn toggle_wikipedia_mode(&mut self) {
        self.wikipedia_mode = !self.wikipedia_mode;
    }

    // ---- voice -----------------------------------------------------------

    pub fn on_voice_event(&mut self, event: VoiceEvent) {
        if let VoiceEvent::Error(reason) = &event {
            self.push_error(format!("Voice recognition error: {}", reason));
        }
        if let Some(utterance) = self.voice.on_event(event) {
            self.send_message(&utterance);
        }
    }

    pub fn voice_state(&self) -> VoiceState {
        self.voice.state()
    }

    // ---- sidebar data ----------------------------------------------------

    pub fn refresh_stats(&mut self) {
        if self.stats_task.is_some() {
            return;
        }
        let client = self.client.clone();
        self.stats_task = Some(tokio::spawn(async move { client.stats().await }));
    }

    // ---- loading / animation ---------------------------------------------

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // ---- chat scrolling --------------------------------------------------

    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        let max = self
            .total_chat_lines()
            .saturating_sub(self.chat_height);
        if self.chat_scroll < max {
            self.chat_scroll += 1;
        }
    }

    /// Wrap-aware line count of the whole log, for scroll math.
    pub fn total_chat_lines(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in &self.messages {
            total_lines += 1; // Sender/time header line
            for line in &msg.fragment.lines {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count: usize = line
                    .spans
                    .iter()
                    .map(|s| s.content.chars().count())
                    .sum();
                if char_count == 0 {
                    total_lines += 1; // Empty line still takes one line
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total_lines += 1; // Blank line after message
        }

        if self.is_loading() {
            total_lines += 2; // "Nova" header + "thinking" line
        }

        total_lines
    }

    pub fn scroll_to_bottom(&mut self) {
        let total_lines = self.total_chat_lines();
        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        if total_lines > visible_height {
            self.chat_scroll = total_lines.saturating_sub(visible_height);
        } else {
            self.chat_scroll = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_app() -> App {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        App::new(Config::new(), tx)
    }

    #[test]
    fn test_starts_with_welcome_placeholder() {
        let app = test_app();
        assert_eq!(app.messages.len(), 1);
        assert_eq!(app.messages[0].sender, MessageSender::Nova);
    }

    #[test]
    fn test_blank_input_produces_no_entries() {
        let mut app = test_app();
        let before = app.messages.len();
        app.send_message("");
        app.send_message("   \t  ");
        assert_eq!(app.messages.len(), before);
        assert!(app.pending.is_none());
    }

    #[test]
    fn test_wikipedia_mode_rewrites_and_deactivates() {
        let mut app = test_app();
        app.toggle_wikipedia_mode();
        let (display, outbound) = app.prepare_outgoing("paris").unwrap();
        assert_eq!(display, "paris");
        assert_eq!(outbound, "wikipedia: paris");
        assert!(!app.wikipedia_mode);
    }

    #[test]
    fn test_wikipedia_mode_skips_already_prefixed() {
        let mut app = test_app();
        app.toggle_wikipedia_mode();
        let (_, outbound) = app.prepare_outgoing("wiki: paris").unwrap();
        assert_eq!(outbound, "wiki: paris");
        // No rewrite happened, so the mode is still armed
        assert!(app.wikipedia_mode);
    }

    #[test]
    fn test_tts_toggle_pair_is_idempotent() {
        let mut app = test_app();
        let original = app.tts_enabled;
        app.toggle_tts();
        app.toggle_tts();
        assert_eq!(app.tts_enabled, original);
    }

    #[test]
    fn test_log_order_is_append_order() {
        let mut app = test_app();
        app.push_user_message("first");
        app.push_envelope(ResponseEnvelope::plain("second", ResponseKind::Plain));
        app.push_user_message("third");
        let texts: Vec<_> = app.messages.iter().skip(1).map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_clear_log_keeps_welcome() {
        let mut app = test_app();
        app.push_user_message("hello");
        app.push_envelope(ResponseEnvelope::plain("hi", ResponseKind::Plain));
        app.clear_log();
        assert_eq!(app.messages.len(), 1);
        assert_eq!(app.messages[0].text, WELCOME_TEXT);
    }

    #[tokio::test]
    async fn test_single_request_in_flight() {
        let mut app = test_app();
        app.send_message("one");
        assert!(app.pending.is_some());
        let before = app.messages.len();
        app.send_message("two");
        // Second send is a no-op while the first is pending
        assert_eq!(app.messages.len(), before);
    }

    #[tokio::test]
    async fn test_enter_while_pending_keeps_input_buffer() {
        let mut app = test_app();
        app.send_message("first question");
        assert!(app.pending.is_some());

        app.input = "second question".to_string();
        app.input_cursor = app.input.chars().count();
        let before = app.messages.len();
        app.send_current_input();

        assert_eq!(app.input, "second question");
        assert_eq!(app.input_cursor, "second question".chars().count());
        assert_eq!(app.messages.len(), before);
    }

    #[tokio::test]
    async fn test_chat_failure_becomes_error_message() {
        let mut app = test_app();
        app.handle_reply(
            RequestSource::Chat,
            Err(anyhow::anyhow!("No memory entries found")),
        );
        let last = app.messages.last().unwrap();
        assert_eq!(last.kind, ResponseKind::Error);
        assert!(last.text.contains("No memory entries found"));
    }

    #[test]
    fn test_voice_transcript_without_engine_is_safe() {
        let mut app = test_app();
        // No recognizer detected; events still must not panic
        app.on_voice_event(VoiceEvent::Error("audio-capture".to_string()));
        let last = app.messages.last().unwrap();
        assert!(last.text.contains("Voice recognition error"));
    }

    #[tokio::test]
    async fn test_action_picker_executes_selected_action() {
        let mut app = test_app();
        app.push_envelope(ResponseEnvelope {
            response: "Status".to_string(),
            kind: ResponseKind::AgentStatus,
            status: Some(crate::envelope::AgentStatus {
                is_active: true,
                pending_actions: 1,
                recent_insights: 0,
                actions: vec![AgentAction {
                    action_id: "reminder_1".to_string(),
                    description: "Send overdue reminder".to_string(),
                    priority: 8,
                }],
            }),
            ..Default::default()
        });
        assert_eq!(app.agent_actions.len(), 1);

        app.open_action_picker();
        assert!(app.show_action_picker);
        app.pick_action();
        assert!(!app.show_action_picker);

        let pending = app.pending.as_ref().unwrap();
        assert_eq!(pending.source, RequestSource::AgentAction);
    }

    #[test]
    fn test_action_picker_without_actions_stays_closed() {
        let mut app = test_app();
        app.open_action_picker();
        assert!(!app.show_action_picker);
    }

    #[tokio::test]
    async fn test_agent_action_reply_requests_fresh_status() {
        let mut app = test_app();
        app.handle_reply(
            RequestSource::AgentAction,
            Ok(ResponseEnvelope::plain("Done", ResponseKind::Plain)),
        );
        let pending = app.pending.as_ref().unwrap();
        assert_eq!(pending.source, RequestSource::AgentStatus);
    }

    #[test]
    fn test_api_key_popup_flow() {
        let mut app = test_app();
        app.open_service_picker();
        assert!(app.show_service_picker);
        app.service_picker_state.select(Some(1));
        app.pick_service();
        assert!(!app.show_service_picker);
        assert!(app.show_api_key_input);
        assert_eq!(app.api_key_service, Some(ApiService::News));

        app.close_popups();
        assert!(!app.show_api_key_input);
        assert!(app.api_key_service.is_none());
    }
}
