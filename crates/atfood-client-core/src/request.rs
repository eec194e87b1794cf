use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_TOKEN: &str = "X-ATFOOD-TOKEN";
pub const HEADER_USER: &str = "X-ATFOOD-USER";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Outbound payload. Only `action` is required; the collaborator validates
/// everything else, so nothing here is checked client-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action: String,
    #[serde(default)]
    pub user_text: Option<String>,
    #[serde(default)]
    pub recipe_id: Option<String>,
    #[serde(default)]
    pub critic_topic: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub prefs: Option<Map<String, Value>>,
}

impl ActionRequest {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            user_text: None,
            recipe_id: None,
            critic_topic: None,
            session_id: None,
            prefs: None,
        }
    }

    pub fn with_user_text(mut self, text: impl Into<String>) -> Self {
        self.user_text = Some(text.into());
        self
    }

    pub fn with_recipe_id(mut self, recipe_id: impl Into<String>) -> Self {
        self.recipe_id = Some(recipe_id.into());
        self
    }

    pub fn with_critic_topic(mut self, topic: impl Into<String>) -> Self {
        self.critic_topic = Some(topic.into());
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_prefs(mut self, prefs: Map<String, Value>) -> Self {
        self.prefs = Some(prefs);
        self
    }

    /// The user's own text as it should be echoed into the transcript, if any.
    #[must_use]
    pub fn echo_text(&self) -> Option<&str> {
        self.user_text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}

/// Collaborator reply. The usage fields are opaque pass-through metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Actions the collaborator currently routes. Requests are not limited to
/// these; any non-empty action string is forwarded as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownAction {
    OpenAiKitchen,
    WorldPicks,
    FoodEra,
    AdjustRecipe,
    CriticNotes,
}

impl KnownAction {
    pub const ALL: [Self; 5] = [
        Self::OpenAiKitchen,
        Self::WorldPicks,
        Self::FoodEra,
        Self::AdjustRecipe,
        Self::CriticNotes,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAiKitchen => "open_ai_kitchen",
            Self::WorldPicks => "world_picks",
            Self::FoodEra => "food_era",
            Self::AdjustRecipe => "adjust_recipe",
            Self::CriticNotes => "critic_notes",
        }
    }

    #[must_use]
    pub fn summary(self) -> &'static str {
        match self {
            Self::OpenAiKitchen => "onboard into the AI kitchen and collect dish + constraints",
            Self::WorldPicks => "world picks and a flavor compass",
            Self::FoodEra => "a two-week food era plan with sauces, techniques, and dishes",
            Self::AdjustRecipe => "adapt a recipe (uses recipe_id) without losing its soul",
            Self::CriticNotes => "punchy critic notes (uses critic_topic)",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim();
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == normalized)
    }
}

/// Recipe ids the collaborator has context for, with their display titles.
pub const KNOWN_RECIPES: [(&str, &str); 3] = [
    ("chili_crisp_noodles", "15-minute chili crisp noodles"),
    ("charred_lemon_chicken", "Charred lemon chicken + herbs"),
    ("silky_tomato_soup", "Silky tomato soup (no sadness)"),
];
