use crate::request::{HEADER_TOKEN, HEADER_USER};

pub const TOKEN_ATTRIBUTE: &str = "data-atfood-token";
pub const USER_ATTRIBUTE: &str = "data-atfood-user";
pub const SESSION_ATTRIBUTE: &str = "data-atfood-session";

pub const ENV_TOKEN: &str = "ATFOOD_TOKEN";
pub const ENV_USER: &str = "ATFOOD_USER";
pub const ENV_SESSION_ID: &str = "ATFOOD_SESSION_ID";

/// Anything that can answer attribute lookups: a DOM element, a headless page
/// element, or a test double.
pub trait AttributeSource {
    fn attribute(&self, name: &str) -> Option<String>;
}

/// Process-wide identity values, fixed when the widget context is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityDefaults {
    pub token: Option<String>,
    pub user: Option<String>,
    pub session_id: Option<String>,
}

impl IdentityDefaults {
    pub fn from_env() -> Self {
        Self {
            token: env_non_empty(ENV_TOKEN),
            user: env_non_empty(ENV_USER),
            session_id: env_non_empty(ENV_SESSION_ID),
        }
    }
}

/// Explicit call-site values; these beat every other source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityOverrides {
    pub token: Option<String>,
    pub user: Option<String>,
    pub session_id: Option<String>,
}

/// Fully resolved identity for one dispatch. Empty string means "not provided".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityContext {
    pub token: String,
    pub user: String,
    pub session_id: String,
}

impl IdentityContext {
    /// Identity headers for the outbound call; empty values are omitted.
    pub fn headers(&self) -> Vec<(String, String)> {
        let mut headers = Vec::new();
        if !self.token.is_empty() {
            headers.push((HEADER_TOKEN.to_string(), self.token.clone()));
        }
        if !self.user.is_empty() {
            headers.push((HEADER_USER.to_string(), self.user.clone()));
        }
        headers
    }
}

pub fn resolve_token(trigger: Option<&dyn AttributeSource>, defaults: &IdentityDefaults) -> String {
    resolve_value(None, trigger, TOKEN_ATTRIBUTE, defaults.token.as_deref())
}

pub fn resolve_user(trigger: Option<&dyn AttributeSource>, defaults: &IdentityDefaults) -> String {
    resolve_value(None, trigger, USER_ATTRIBUTE, defaults.user.as_deref())
}

pub fn resolve_session_id(
    trigger: Option<&dyn AttributeSource>,
    defaults: &IdentityDefaults,
) -> String {
    resolve_value(None, trigger, SESSION_ATTRIBUTE, defaults.session_id.as_deref())
}

/// Resolves all three values fresh; nothing is cached between dispatches.
pub fn resolve_identity(
    overrides: &IdentityOverrides,
    trigger: Option<&dyn AttributeSource>,
    defaults: &IdentityDefaults,
) -> IdentityContext {
    IdentityContext {
        token: resolve_value(
            overrides.token.as_deref(),
            trigger,
            TOKEN_ATTRIBUTE,
            defaults.token.as_deref(),
        ),
        user: resolve_value(
            overrides.user.as_deref(),
            trigger,
            USER_ATTRIBUTE,
            defaults.user.as_deref(),
        ),
        session_id: resolve_value(
            overrides.session_id.as_deref(),
            trigger,
            SESSION_ATTRIBUTE,
            defaults.session_id.as_deref(),
        ),
    }
}

fn resolve_value(
    explicit: Option<&str>,
    trigger: Option<&dyn AttributeSource>,
    attribute: &str,
    default: Option<&str>,
) -> String {
    explicit
        .and_then(non_empty)
        .or_else(|| {
            trigger
                .and_then(|trigger| trigger.attribute(attribute))
                .as_deref()
                .and_then(non_empty)
        })
        .or_else(|| default.and_then(non_empty))
        .unwrap_or_default()
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().as_deref().and_then(non_empty)
}
