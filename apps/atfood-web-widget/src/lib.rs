#![allow(clippy::needless_pass_by_value)]

#[cfg(any(target_arch = "wasm32", test))]
mod console_log;
#[cfg(any(target_arch = "wasm32", test))]
mod host_options;

#[cfg(target_arch = "wasm32")]
mod wasm {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use async_trait::async_trait;
    use atfood_client_core::render::PulldownMarkdown;
    use atfood_client_core::transcript::{CHAT_CONTAINER_CLASS, MESSAGE_LIST_CLASS};
    use atfood_client_core::{
        ActionCall, ActionTransport, AttributeSource, CustomRenderer, DispatchEngine,
        DispatchError, HttpReply, IdentityDefaults, MarkdownEngine, RenderOptions,
        RenderPipeline, Sanitizer, TextInput, TranscriptMessage, TranscriptSurface,
        TriggerBinding, TriggerElement, WidgetConfig, WidgetContext, sanitize_html,
    };
    use gloo_net::http::Request;
    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::{future_to_promise, spawn_local};
    use web_sys::{Document, Element, HtmlInputElement, HtmlTextAreaElement, Node, Window};

    use crate::host_options::{parse_payload, parse_send_options};

    mod binding;
    mod console;
    mod dom;
    mod host;
    mod network;

    use binding::install_click_binding;
    use console::install_console_logging;
    use dom::{DomElement, DomMessage, DomSurface};
    use host::{announce_ready_when_loaded, install_host_object, pipeline_for, read_identity_defaults};
    use network::GlooTransport;

    type WidgetEngine = DispatchEngine<DomSurface, GlooTransport>;

    const HOST_OBJECT_NAME: &str = "ATFOOD";
    const READY_EVENT_NAME: &str = "atfood:ready";

    thread_local! {
        static ENGINE: RefCell<Option<Rc<WidgetEngine>>> = const { RefCell::new(None) };
    }

    fn current_engine() -> Option<Rc<WidgetEngine>> {
        ENGINE.with(|slot| slot.borrow().clone())
    }

    #[wasm_bindgen(start)]
    pub fn start() {
        console_error_panic_hook::set_once();
        install_console_logging();
        match boot() {
            Ok(()) => tracing::info!("atfood widget started"),
            Err(error) => tracing::error!(%error, "atfood widget failed to start"),
        }
    }

    fn boot() -> Result<(), String> {
        let window = web_sys::window().ok_or_else(|| "window is unavailable".to_string())?;
        let document = window
            .document()
            .ok_or_else(|| "document is unavailable".to_string())?;

        let location = window.location();
        let hostname = location.hostname().unwrap_or_default();
        let origin = location.origin().unwrap_or_default();
        let config =
            WidgetConfig::for_location(&hostname, &origin).map_err(|error| error.to_string())?;
        let defaults = read_identity_defaults(&window);

        let context = Rc::new(WidgetContext::new(config, defaults));
        let engine = Rc::new(DispatchEngine::new(
            context,
            Rc::new(DomSurface::new(document.clone())),
            GlooTransport,
            pipeline_for(&window),
        ));
        ENGINE.with(|slot| *slot.borrow_mut() = Some(engine));

        install_host_object(&window)?;
        install_click_binding(&document)?;
        announce_ready_when_loaded(&window, &document)
    }
}
