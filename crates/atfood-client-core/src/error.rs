use thiserror::Error;

use crate::dispatch::DispatchStatus;

/// Why a dispatch ended in the `Failed` state.
///
/// None of these ever reach the end user; the transcript only shows the fixed
/// fallback message. They exist for logs and for hosts that want diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("invalid action request: {0}")]
    InvalidRequest(String),
    #[error("failed to encode action request: {0}")]
    Encode(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("request failed with status {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl DispatchError {
    /// Stable snake_case code used as a structured log field.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::Encode(_) => "encode",
            Self::Network(_) => "network",
            Self::Status { .. } => "status",
            Self::Decode(_) => "decode",
        }
    }

    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::InvalidRequest(_) | Self::Encode(_) | Self::Network(_) | Self::Decode(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid dispatch transition {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub from: DispatchStatus,
    pub to: DispatchStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("endpoint url must not be empty")]
    EmptyEndpoint,
    #[error("endpoint url must use http:// or https:// and include a host")]
    InvalidEndpoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WidgetError {
    #[error("a custom renderer is already mounted")]
    RendererAlreadyMounted,
    #[error("the document click binding is already installed")]
    BindingAlreadyInstalled,
    #[error("invalid action payload: {0}")]
    InvalidPayload(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
