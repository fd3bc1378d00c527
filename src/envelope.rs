use serde::Deserialize;
use std::collections::BTreeMap;

/// Category tag selecting which rendering template applies to a backend reply.
///
/// Unrecognized tags decode to `Plain` so a newer backend never breaks the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum ResponseKind {
    #[default]
    Plain,
    Knowledge,
    Weather,
    News,
    DailyPlan,
    DailyBriefing,
    Memory,
    AgentStatus,
    Insights,
    Error,
    Help,
    Success,
    System,
    VoiceSuccess,
}

impl ResponseKind {
    pub fn from_str(s: &str) -> Self {
        match s {
            "knowledge" => ResponseKind::Knowledge,
            "weather" => ResponseKind::Weather,
            "news" => ResponseKind::News,
            "daily_plan" => ResponseKind::DailyPlan,
            "daily_briefing" => ResponseKind::DailyBriefing,
            "memory" => ResponseKind::Memory,
            "agent_status" => ResponseKind::AgentStatus,
            "insights" => ResponseKind::Insights,
            "error" => ResponseKind::Error,
            "help" => ResponseKind::Help,
            "success" => ResponseKind::Success,
            "system" => ResponseKind::System,
            "voice_success" => ResponseKind::VoiceSuccess,
            _ => ResponseKind::Plain,
        }
    }
}

impl From<String> for ResponseKind {
    fn from(s: String) -> Self {
        ResponseKind::from_str(&s)
    }
}

/// A backend reply: display text, a kind tag, and kind-specific payload
/// fields. Every payload field is optional; the renderer degrades gracefully
/// when a field it wants is absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub response: String,
    #[serde(rename = "type", default)]
    pub kind: ResponseKind,
    #[serde(default)]
    pub should_speak: bool,

    // knowledge fields (top-level in the wire format)
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub url: Option<String>,

    // weather and daily-briefing payloads both arrive under "data"
    #[serde(default)]
    pub data: Option<DataPayload>,

    #[serde(default)]
    pub articles: Option<Vec<NewsArticle>>,
    #[serde(default)]
    pub plan: Option<DailyPlan>,

    // memory fields
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub entries: Option<Vec<MemoryEntry>>,

    #[serde(default)]
    pub status: Option<AgentStatus>,
    #[serde(default)]
    pub insights: Option<Vec<Insight>>,
}

impl ResponseEnvelope {
    /// An error-kind envelope built locally (network failures etc.).
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            response: text.into(),
            kind: ResponseKind::Error,
            ..Default::default()
        }
    }

    pub fn plain(text: impl Into<String>, kind: ResponseKind) -> Self {
        Self {
            response: text.into(),
            kind,
            ..Default::default()
        }
    }
}

/// Shared "data" object. The weather kind puts its fields here directly;
/// the daily-briefing kind nests a weather object plus headlines and tasks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataPayload {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub wind_speed: Option<f64>,

    #[serde(default)]
    pub weather: Option<WeatherSummary>,
    #[serde(default)]
    pub news_headlines: Option<Vec<NewsArticle>>,
    #[serde(default)]
    pub tasks_today: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeatherSummary {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewsArticle {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DailyPlan {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub weather: Option<WeatherSummary>,
    #[serde(default)]
    pub priority_tasks: Option<Vec<PlanTask>>,
    #[serde(default)]
    pub time_blocks: Option<Vec<TimeBlock>>,
    #[serde(default)]
    pub suggestions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanTask {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimeBlock {
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub task: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoryEntry {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub recurring: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentStatus {
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub pending_actions: u32,
    #[serde(default)]
    pub recent_insights: u32,
    #[serde(default)]
    pub actions: Vec<AgentAction>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentAction {
    #[serde(default)]
    pub action_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: u8,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Insight {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub confidence: f64,
}

/// Sidebar stats for the memory store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoryStats {
    #[serde(default)]
    pub total_entries: u64,
    #[serde(default)]
    pub categories: Option<BTreeMap<String, u64>>,
    #[serde(default)]
    pub recent_activity: Option<String>,
}

/// Health of one external service as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum ServiceState {
    Online,
    Offline,
    NoKey,
    #[default]
    Unknown,
}

impl ServiceState {
    pub fn from_str(s: &str) -> Self {
        match s {
            "online" => ServiceState::Online,
            "offline" => ServiceState::Offline,
            "no_key" => ServiceState::NoKey,
            _ => ServiceState::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ServiceState::Online => "Online",
            ServiceState::Offline => "Offline",
            ServiceState::NoKey => "No key",
            ServiceState::Unknown => "Unknown",
        }
    }
}

impl From<String> for ServiceState {
    fn from(s: String) -> Self {
        ServiceState::from_str(&s)
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ExternalStatus {
    #[serde(default)]
    pub wikipedia: ServiceState,
    #[serde(default)]
    pub weather: ServiceState,
    #[serde(default)]
    pub news: ServiceState,
}

impl ExternalStatus {
    /// Fail-safe reading used when the status fetch itself fails.
    pub fn all_offline() -> Self {
        Self {
            wikipedia: ServiceState::Offline,
            weather: ServiceState::Offline,
            news: ServiceState::Offline,
        }
    }
}
