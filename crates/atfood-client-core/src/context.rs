use std::cell::OnceCell;
use std::rc::Rc;

use crate::config::WidgetConfig;
use crate::dispatch::CustomRenderer;
use crate::error::WidgetError;
use crate::identity::IdentityDefaults;

/// Everything a dispatch needs that is fixed at startup.
///
/// `config` and `defaults` are immutable once built. The custom renderer slot
/// is single-assignment: it starts empty and may be filled once by the host.
pub struct WidgetContext<H> {
    config: WidgetConfig,
    defaults: IdentityDefaults,
    renderer: OnceCell<Rc<dyn CustomRenderer<H>>>,
}

impl<H> WidgetContext<H> {
    pub fn new(config: WidgetConfig, defaults: IdentityDefaults) -> Self {
        Self {
            config,
            defaults,
            renderer: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn defaults(&self) -> &IdentityDefaults {
        &self.defaults
    }

    pub fn mount(&self, renderer: Rc<dyn CustomRenderer<H>>) -> Result<(), WidgetError> {
        self.renderer.set(renderer).map_err(|_| {
            tracing::warn!("custom renderer already mounted; keeping the first one");
            WidgetError::RendererAlreadyMounted
        })
    }

    pub fn renderer(&self) -> Option<Rc<dyn CustomRenderer<H>>> {
        self.renderer.get().cloned()
    }
}

impl<H> std::fmt::Debug for WidgetContext<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetContext")
            .field("config", &self.config)
            .field("defaults", &self.defaults)
            .field("renderer_mounted", &self.renderer.get().is_some())
            .finish()
    }
}
