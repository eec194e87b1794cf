//! Action dispatch: optimistic placeholder, network round trip, rendering.
//!
//! Every call walks `Building -> Pending -> {Resolved | Failed}` on its own
//! [`DispatchState`]. The placeholder is appended before the transport is
//! awaited, so the transcript reacts immediately regardless of latency. Calls
//! are independent: concurrent dispatches each get a placeholder in call order
//! and resolve at that position, in whatever order the network completes.

use std::cell::Cell;
use std::rc::Rc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::WidgetContext;
use crate::error::{DispatchError, InvalidTransition};
use crate::identity::{AttributeSource, IdentityContext, IdentityOverrides, resolve_identity};
use crate::render::RenderPipeline;
use crate::request::{
    ActionRequest, ActionResponse, HEADER_CONTENT_TYPE, JSON_CONTENT_TYPE,
};
use crate::transcript::{
    FALLBACK_MESSAGE, TranscriptMessage, TranscriptSurface, assistant_markup,
};
use crate::trigger::{TriggerDispatch, TriggerElement};

const MAX_ERROR_DETAIL_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    Building,
    Pending,
    Resolved,
    Failed,
}

impl DispatchStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Failed)
    }

    fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Building, Self::Pending | Self::Failed)
                | (Self::Pending, Self::Resolved | Self::Failed)
        )
    }
}

/// Value-typed state of one dispatch, observable without any UI toolkit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchState {
    pub status: DispatchStatus,
    pub request_id: u64,
    pub mount_point_id: String,
}

impl DispatchState {
    pub fn new(request_id: u64, mount_point_id: impl Into<String>) -> Self {
        Self {
            status: DispatchStatus::Building,
            request_id,
            mount_point_id: mount_point_id.into(),
        }
    }

    pub fn advance(&mut self, next: DispatchStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_advance_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

pub trait DispatchObserver {
    fn observe(&self, state: &DispatchState);
}

impl<F> DispatchObserver for F
where
    F: Fn(&DispatchState),
{
    fn observe(&self, state: &DispatchState) {
        self(state);
    }
}

/// A fully built outbound POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionCall {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl ActionCall {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

/// Network seam. Implementations only move bytes; status and body checks
/// happen in [`decode_reply`].
#[async_trait(?Send)]
pub trait ActionTransport {
    async fn post(&self, call: ActionCall) -> Result<HttpReply, DispatchError>;
}

#[async_trait(?Send)]
impl<T> ActionTransport for Rc<T>
where
    T: ActionTransport + ?Sized,
{
    async fn post(&self, call: ActionCall) -> Result<HttpReply, DispatchError> {
        (**self).post(call).await
    }
}

pub fn build_call(
    endpoint_url: &str,
    request: &ActionRequest,
    identity: &IdentityContext,
) -> Result<ActionCall, DispatchError> {
    let body =
        serde_json::to_string(request).map_err(|error| DispatchError::Encode(error.to_string()))?;
    let mut headers = vec![(
        HEADER_CONTENT_TYPE.to_string(),
        JSON_CONTENT_TYPE.to_string(),
    )];
    headers.extend(identity.headers());
    Ok(ActionCall {
        url: endpoint_url.to_string(),
        headers,
        body,
    })
}

pub fn decode_reply(reply: HttpReply) -> Result<ActionResponse, DispatchError> {
    if !(200..=299).contains(&reply.status) {
        return Err(DispatchError::Status {
            status: reply.status,
            detail: error_detail(&reply.body),
        });
    }
    serde_json::from_str(&reply.body).map_err(|error| DispatchError::Decode(error.to_string()))
}

/// Best-effort reason from an error body: its `detail` string when the body
/// is JSON, otherwise the leading part of the raw text.
fn error_detail(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(detail) = value.get("detail").and_then(|detail| detail.as_str()) {
            return detail.to_string();
        }
    }
    body.trim().chars().take(MAX_ERROR_DETAIL_CHARS).collect()
}

/// What a custom renderer receives next to the response text.
#[derive(Debug)]
pub struct RenderOptions<H> {
    /// Placeholder of this dispatch; `None` when the mount point is missing.
    pub pending: Option<H>,
    pub mount_point_id: String,
    pub typing_effect: bool,
}

/// Host-supplied display for successful responses. Once mounted it owns
/// display entirely, including the pending placeholder.
pub trait CustomRenderer<H> {
    fn render(&self, text: &str, options: RenderOptions<H>);
}

impl<H, F> CustomRenderer<H> for F
where
    F: Fn(&str, RenderOptions<H>),
{
    fn render(&self, text: &str, options: RenderOptions<H>) {
        self(text, options);
    }
}

/// Per-call knobs for [`DispatchEngine::send_action`].
#[derive(Default)]
pub struct DispatchOptions<'a> {
    /// Element whose `data-atfood-*` identity attributes apply.
    pub trigger: Option<&'a dyn AttributeSource>,
    pub identity: IdentityOverrides,
    /// Overrides the configured mount point for this call.
    pub mount_point_id: Option<String>,
    pub typing_effect: bool,
}

pub struct DispatchEngine<S, T>
where
    S: TranscriptSurface,
{
    context: Rc<WidgetContext<S::Handle>>,
    surface: Rc<S>,
    transport: T,
    pipeline: RenderPipeline,
    observer: Option<Box<dyn DispatchObserver>>,
    next_request_id: Cell<u64>,
}

impl<S, T> DispatchEngine<S, T>
where
    S: TranscriptSurface,
    T: ActionTransport,
{
    pub fn new(
        context: Rc<WidgetContext<S::Handle>>,
        surface: Rc<S>,
        transport: T,
        pipeline: RenderPipeline,
    ) -> Self {
        Self {
            context,
            surface,
            transport,
            pipeline,
            observer: None,
            next_request_id: Cell::new(1),
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn DispatchObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn context(&self) -> &Rc<WidgetContext<S::Handle>> {
        &self.context
    }

    pub fn surface(&self) -> &Rc<S> {
        &self.surface
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Runs one dispatch to completion. Returns the parsed response on success
    /// and `None` on any failure; failures never propagate past this call.
    ///
    /// A request with a blank action fails before anything is shown or sent.
    pub async fn send_action(
        &self,
        mut request: ActionRequest,
        options: DispatchOptions<'_>,
    ) -> Option<ActionResponse> {
        let request_id = self.allocate_request_id();
        let mount_point_id = options
            .mount_point_id
            .unwrap_or_else(|| self.context.config().mount_point_id.clone());
        let mut state = DispatchState::new(request_id, mount_point_id.clone());
        self.report(&state, &request.action);

        if request.action.trim().is_empty() {
            let error = DispatchError::InvalidRequest("action must not be empty".to_string());
            self.fail(&mut state, &request.action, None, &error);
            return None;
        }

        let pending = self.show_pending(&mount_point_id, &request);
        let identity = resolve_identity(&options.identity, options.trigger, self.context.defaults());
        // A payload session id is sent as given; otherwise the resolved one.
        if request.session_id.is_none() && !identity.session_id.is_empty() {
            request.session_id = Some(identity.session_id.clone());
        }

        let call = match build_call(&self.context.config().endpoint_url, &request, &identity) {
            Ok(call) => call,
            Err(error) => {
                self.fail(&mut state, &request.action, pending, &error);
                return None;
            }
        };

        self.transition(&mut state, DispatchStatus::Pending, &request.action);
        let outcome = self.transport.post(call).await.and_then(decode_reply);

        match outcome {
            Ok(response) => {
                self.transition(&mut state, DispatchStatus::Resolved, &request.action);
                tracing::info!(
                    request_id,
                    action = %request.action,
                    prompt_tokens = ?response.prompt_tokens,
                    response_tokens = ?response.response_tokens,
                    total_cost = ?response.total_cost,
                    "atfood action resolved"
                );
                self.deliver(&response.text, pending, mount_point_id, options.typing_effect);
                Some(response)
            }
            Err(error) => {
                self.fail(&mut state, &request.action, pending, &error);
                None
            }
        }
    }

    /// Dispatch for a recognized trigger click. Identity comes from the trigger
    /// element; the mount point is scrolled into view once the call settles.
    pub async fn dispatch_trigger<E>(&self, dispatch: TriggerDispatch<E>) -> Option<ActionResponse>
    where
        E: TriggerElement,
    {
        let TriggerDispatch { trigger, request } = dispatch;
        let options = DispatchOptions {
            trigger: Some(&trigger),
            typing_effect: true,
            ..DispatchOptions::default()
        };
        let response = self.send_action(request, options).await;
        self.surface
            .scroll_into_view(&self.context.config().mount_point_id);
        response
    }

    fn allocate_request_id(&self) -> u64 {
        let id = self.next_request_id.get();
        self.next_request_id.set(id + 1);
        id
    }

    fn show_pending(&self, mount_point_id: &str, request: &ActionRequest) -> Option<S::Handle> {
        let Some(chat) = self.surface.ensure_chat(mount_point_id) else {
            tracing::debug!(mount_point_id, "mount point missing; dispatching without transcript");
            return None;
        };
        if let Some(text) = request.echo_text() {
            self.surface
                .append_message(&chat, TranscriptMessage::user(text));
        }
        self.surface
            .append_message(&chat, TranscriptMessage::pending())
    }

    fn deliver(
        &self,
        text: &str,
        pending: Option<S::Handle>,
        mount_point_id: String,
        typing_effect: bool,
    ) {
        if let Some(renderer) = self.context.renderer() {
            renderer.render(
                text,
                RenderOptions {
                    pending,
                    mount_point_id,
                    typing_effect,
                },
            );
            return;
        }
        if let Some(handle) = pending {
            let markup = assistant_markup(&self.pipeline.render_markup(text));
            self.surface.replace_pending(handle, &markup);
        }
    }

    fn fail(
        &self,
        state: &mut DispatchState,
        action: &str,
        pending: Option<S::Handle>,
        error: &DispatchError,
    ) {
        self.transition(state, DispatchStatus::Failed, action);
        tracing::warn!(
            request_id = state.request_id,
            action,
            kind = error.kind(),
            status = ?error.status_code(),
            error = %error,
            "atfood action failed"
        );
        if let Some(handle) = pending {
            let markup = self.pipeline.render_markup(FALLBACK_MESSAGE);
            self.surface.replace_pending(handle, &markup);
        }
    }

    fn transition(&self, state: &mut DispatchState, next: DispatchStatus, action: &str) {
        if let Err(error) = state.advance(next) {
            tracing::warn!(request_id = state.request_id, %error, "dispatch state not advanced");
            return;
        }
        self.report(state, action);
    }

    fn report(&self, state: &DispatchState, action: &str) {
        tracing::debug!(
            request_id = state.request_id,
            action,
            status = ?state.status,
            mount_point_id = %state.mount_point_id,
            "dispatch state"
        );
        if let Some(observer) = &self.observer {
            observer.observe(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{HEADER_TOKEN, HEADER_USER};
    use serde_json::json;

    #[test]
    fn state_machine_allows_only_forward_transitions() {
        let mut state = DispatchState::new(1, "atfood-ai-output");
        assert_eq!(state.status, DispatchStatus::Building);
        assert_eq!(
            state.advance(DispatchStatus::Resolved),
            Err(InvalidTransition {
                from: DispatchStatus::Building,
                to: DispatchStatus::Resolved,
            })
        );
        state.advance(DispatchStatus::Pending).expect("building -> pending");
        state.advance(DispatchStatus::Resolved).expect("pending -> resolved");
        assert!(state.status.is_terminal());
        assert!(state.advance(DispatchStatus::Failed).is_err());
    }

    #[test]
    fn building_may_fail_directly() {
        let mut state = DispatchState::new(7, "out");
        state.advance(DispatchStatus::Failed).expect("building -> failed");
        assert!(state.advance(DispatchStatus::Pending).is_err());
    }

    #[test]
    fn build_call_sets_identity_headers_only_when_present() {
        let request = ActionRequest::new("world_picks");
        let identity = IdentityContext {
            token: "t-1".into(),
            user: String::new(),
            session_id: "s-1".into(),
        };
        let call = build_call("http://127.0.0.1:8000/api/atfood", &request, &identity)
            .expect("encodes");
        assert_eq!(call.header("content-type"), Some("application/json"));
        assert_eq!(call.header(HEADER_TOKEN), Some("t-1"));
        assert_eq!(call.header(HEADER_USER), None);

        let body: serde_json::Value = serde_json::from_str(&call.body).expect("json body");
        assert_eq!(body["action"], "world_picks");
        assert_eq!(body["user_text"], serde_json::Value::Null);
    }

    #[test]
    fn decode_reply_accepts_2xx_json() {
        let response = decode_reply(HttpReply {
            status: 200,
            body: json!({"text": "ok", "response_tokens": 3}).to_string(),
        })
        .expect("decodes");
        assert_eq!(response.text, "ok");
        assert_eq!(response.response_tokens, Some(3));
    }

    #[test]
    fn decode_reply_keeps_status_and_detail() {
        let error = decode_reply(HttpReply {
            status: 429,
            body: json!({"detail": "Rate limit exceeded"}).to_string(),
        })
        .expect_err("status error");
        assert_eq!(
            error,
            DispatchError::Status {
                status: 429,
                detail: "Rate limit exceeded".into()
            }
        );

        let error = decode_reply(HttpReply {
            status: 502,
            body: "  Bad Gateway ".into(),
        })
        .expect_err("status error");
        assert_eq!(error.status_code(), Some(502));
        assert_eq!(error.to_string(), "request failed with status 502: Bad Gateway");
    }

    #[test]
    fn decode_reply_rejects_bodies_without_text() {
        let error = decode_reply(HttpReply {
            status: 200,
            body: json!({"answer": "nope"}).to_string(),
        })
        .expect_err("missing text");
        assert_eq!(error.kind(), "decode");
    }
}
