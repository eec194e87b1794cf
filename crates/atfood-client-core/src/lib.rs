//! Client core for the ATFOOD assistant widget.

pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod identity;
pub mod page;
pub mod render;
pub mod request;
mod sanitize;
pub mod transcript;
pub mod trigger;

pub use config::WidgetConfig;
pub use context::WidgetContext;
pub use dispatch::{
    ActionCall, ActionTransport, CustomRenderer, DispatchEngine, DispatchObserver,
    DispatchOptions, DispatchState, DispatchStatus, HttpReply, RenderOptions,
};
pub use error::{ConfigError, DispatchError, InvalidTransition, WidgetError};
pub use identity::{AttributeSource, IdentityContext, IdentityDefaults, IdentityOverrides};
pub use page::Page;
pub use render::{MarkdownEngine, RenderPipeline, Sanitizer, escape_html};
pub use request::{ActionRequest, ActionResponse, KnownAction};
pub use sanitize::sanitize_html;
pub use transcript::{Role, TextInput, TranscriptMessage, TranscriptSurface};
pub use trigger::{TriggerBinding, TriggerDispatch, TriggerElement, TriggerParams};
