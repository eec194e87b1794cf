//! Decoding of the arguments a host page passes to `ATFOOD.sendAction`.
//!
//! The browser side stringifies both arguments with `JSON.stringify`, so
//! everything here works on plain JSON and runs under native tests.

use atfood_client_core::{ActionRequest, DispatchOptions, IdentityOverrides, WidgetError};
use serde::Deserialize;

/// Second argument of `sendAction`. Unknown keys (including a `trigger`
/// element, which stringifies to `{}`) are ignored here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SendActionOptions {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default, alias = "mountPointId")]
    pub mount_id: Option<String>,
    #[serde(default)]
    pub typing: bool,
}

impl SendActionOptions {
    pub(crate) fn into_dispatch_options<'a>(self) -> DispatchOptions<'a> {
        DispatchOptions {
            trigger: None,
            identity: IdentityOverrides {
                token: self.token,
                user: self.user,
                session_id: self.session_id,
            },
            mount_point_id: self.mount_id.filter(|id| !id.trim().is_empty()),
            typing_effect: self.typing,
        }
    }
}

pub(crate) fn parse_payload(json: &str) -> Result<ActionRequest, WidgetError> {
    let request: ActionRequest = serde_json::from_str(json)
        .map_err(|error| WidgetError::InvalidPayload(error.to_string()))?;
    if request.action.trim().is_empty() {
        return Err(WidgetError::InvalidPayload(
            "action must not be empty".to_string(),
        ));
    }
    Ok(request)
}

/// `None`, `undefined` and `null` all mean "no options".
pub(crate) fn parse_send_options(json: Option<&str>) -> Result<SendActionOptions, WidgetError> {
    match json.map(str::trim) {
        None | Some("" | "null") => Ok(SendActionOptions::default()),
        Some(json) => serde_json::from_str(json)
            .map_err(|error| WidgetError::InvalidPayload(error.to_string())),
    }
}
