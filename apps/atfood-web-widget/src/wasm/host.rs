use super::*;

const TOKEN_GLOBAL: &str = "ATFOOD_TOKEN";
const USER_GLOBAL: &str = "ATFOOD_USER";
const SESSION_GLOBAL: &str = "ATFOOD_SESSION_ID";

thread_local! {
    static MOUNT_HANDLER: RefCell<Option<Closure<dyn FnMut(JsValue) -> JsValue>>> =
        const { RefCell::new(None) };
    static SEND_HANDLER: RefCell<Option<Closure<dyn FnMut(JsValue, JsValue) -> js_sys::Promise>>> =
        const { RefCell::new(None) };
    static READY_HANDLER: RefCell<Option<Closure<dyn FnMut(web_sys::Event)>>> =
        const { RefCell::new(None) };
    static READY_SENT: Cell<bool> = const { Cell::new(false) };
}

fn global(target: &JsValue, name: &str) -> Option<JsValue> {
    js_sys::Reflect::get(target, &JsValue::from_str(name))
        .ok()
        .filter(|value| !value.is_undefined() && !value.is_null())
}

fn global_string(window: &Window, name: &str) -> Option<String> {
    global(window, name)
        .and_then(|value| value.as_string())
        .filter(|value| !value.trim().is_empty())
}

fn method(target: &JsValue, name: &str) -> Option<js_sys::Function> {
    global(target, name).and_then(|value| value.dyn_into::<js_sys::Function>().ok())
}

pub(super) fn read_identity_defaults(window: &Window) -> IdentityDefaults {
    IdentityDefaults {
        token: global_string(window, TOKEN_GLOBAL),
        user: global_string(window, USER_GLOBAL),
        session_id: global_string(window, SESSION_GLOBAL),
    }
}

/// `window.marked` when the page loaded it, pulldown-cmark otherwise.
/// `window.DOMPurify` when present, the built-in sanitizer otherwise.
pub(super) fn pipeline_for(window: &Window) -> RenderPipeline {
    let markdown: Box<dyn MarkdownEngine> = match global(window, "marked") {
        Some(marked) if method(&marked, "parse").is_some() => Box::new(JsMarkdown { marked }),
        _ => Box::new(PulldownMarkdown),
    };
    let sanitizer = global(window, "DOMPurify")
        .filter(|purify| method(purify, "sanitize").is_some())
        .map(|purify| Box::new(JsDomPurify { purify }) as Box<dyn Sanitizer>);
    RenderPipeline::new(Some(markdown), sanitizer)
}

struct JsMarkdown {
    marked: JsValue,
}

impl MarkdownEngine for JsMarkdown {
    fn to_html(&self, markdown: &str) -> String {
        let converted = method(&self.marked, "parse")
            .and_then(|parse| parse.call1(&self.marked, &JsValue::from_str(markdown)).ok())
            .and_then(|html| html.as_string());
        match converted {
            Some(html) => html,
            None => {
                tracing::warn!("marked.parse failed; using built-in markdown");
                PulldownMarkdown.to_html(markdown)
            }
        }
    }
}

struct JsDomPurify {
    purify: JsValue,
}

impl Sanitizer for JsDomPurify {
    fn sanitize(&self, html: &str) -> String {
        let cleaned = method(&self.purify, "sanitize")
            .and_then(|sanitize| sanitize.call1(&self.purify, &JsValue::from_str(html)).ok())
            .and_then(|clean| clean.as_string());
        match cleaned {
            Some(clean) => clean,
            None => {
                tracing::warn!("DOMPurify.sanitize failed; using built-in sanitizer");
                sanitize_html(html)
            }
        }
    }
}

/// Page-supplied renderer registered through `ATFOOD.mount(fn)`. Called as
/// `fn(text, { pending, mount, mountId, typing })`.
struct JsRenderer {
    function: js_sys::Function,
    document: Document,
}

impl CustomRenderer<DomMessage> for JsRenderer {
    fn render(&self, text: &str, options: RenderOptions<DomMessage>) {
        let bag = js_sys::Object::new();
        let pending = options
            .pending
            .as_ref()
            .map_or(JsValue::NULL, |message| message.element().clone().into());
        let mount = self
            .document
            .get_element_by_id(&options.mount_point_id)
            .map_or(JsValue::NULL, JsValue::from);
        let _ = js_sys::Reflect::set(&bag, &JsValue::from_str("pending"), &pending);
        let _ = js_sys::Reflect::set(&bag, &JsValue::from_str("mount"), &mount);
        let _ = js_sys::Reflect::set(
            &bag,
            &JsValue::from_str("mountId"),
            &JsValue::from_str(&options.mount_point_id),
        );
        let _ = js_sys::Reflect::set(
            &bag,
            &JsValue::from_str("typing"),
            &JsValue::from_bool(options.typing_effect),
        );

        if let Err(error) = self
            .function
            .call2(&JsValue::NULL, &JsValue::from_str(text), &bag)
        {
            tracing::warn!(?error, "mounted renderer threw");
        }
    }
}

/// Publishes `window.ATFOOD` with `mount(fn)` and `sendAction(payload, options)`.
pub(super) fn install_host_object(window: &Window) -> Result<(), String> {
    let host = js_sys::Object::new();

    let mount = Closure::<dyn FnMut(JsValue) -> JsValue>::wrap(Box::new(|renderer: JsValue| {
        JsValue::from_bool(mount_renderer(renderer))
    }));
    let send = Closure::<dyn FnMut(JsValue, JsValue) -> js_sys::Promise>::wrap(Box::new(
        |payload: JsValue, options: JsValue| {
            future_to_promise(async move { Ok(send_action_from_js(payload, options).await) })
        },
    ));

    js_sys::Reflect::set(&host, &JsValue::from_str("mount"), mount.as_ref())
        .map_err(|_| "failed to publish ATFOOD.mount".to_string())?;
    js_sys::Reflect::set(&host, &JsValue::from_str("sendAction"), send.as_ref())
        .map_err(|_| "failed to publish ATFOOD.sendAction".to_string())?;
    js_sys::Reflect::set(window, &JsValue::from_str(HOST_OBJECT_NAME), &host)
        .map_err(|_| "failed to publish window.ATFOOD".to_string())?;

    MOUNT_HANDLER.with(|slot| *slot.borrow_mut() = Some(mount));
    SEND_HANDLER.with(|slot| *slot.borrow_mut() = Some(send));
    Ok(())
}

fn mount_renderer(renderer: JsValue) -> bool {
    let Some(engine) = current_engine() else {
        tracing::warn!("ATFOOD.mount called before the widget started");
        return false;
    };
    let Ok(function) = renderer.dyn_into::<js_sys::Function>() else {
        tracing::warn!("ATFOOD.mount expects a function");
        return false;
    };

    let renderer = JsRenderer {
        function,
        document: engine.surface().document().clone(),
    };
    match engine.context().mount(Rc::new(renderer)) {
        Ok(()) => true,
        Err(error) => {
            tracing::warn!(%error, "ATFOOD.mount rejected");
            false
        }
    }
}

fn stringify(value: &JsValue) -> Option<String> {
    if value.is_undefined() || value.is_null() {
        return None;
    }
    js_sys::JSON::stringify(value)
        .ok()
        .and_then(|json| json.as_string())
}

/// Resolves to the parsed response, or `null` on any failure. The promise never
/// rejects.
async fn send_action_from_js(payload: JsValue, options: JsValue) -> JsValue {
    let Some(engine) = current_engine() else {
        tracing::warn!("ATFOOD.sendAction called before the widget started");
        return JsValue::NULL;
    };

    let request = match parse_payload(&stringify(&payload).unwrap_or_default()) {
        Ok(request) => request,
        Err(error) => {
            tracing::warn!(%error, "ATFOOD.sendAction payload rejected");
            return JsValue::NULL;
        }
    };
    let send_options = match parse_send_options(stringify(&options).as_deref()) {
        Ok(send_options) => send_options,
        Err(error) => {
            tracing::warn!(%error, "ATFOOD.sendAction options rejected");
            return JsValue::NULL;
        }
    };

    let trigger = global(&options, "trigger")
        .and_then(|value| value.dyn_into::<Element>().ok())
        .map(DomElement);
    let mut dispatch_options = send_options.into_dispatch_options();
    dispatch_options.trigger = trigger
        .as_ref()
        .map(|element| element as &dyn AttributeSource);

    match engine.send_action(request, dispatch_options).await {
        Some(response) => serde_json::to_string(&response)
            .ok()
            .and_then(|json| js_sys::JSON::parse(&json).ok())
            .unwrap_or(JsValue::NULL),
        None => JsValue::NULL,
    }
}

/// Fires `atfood:ready` on `window` once the document has been parsed, right
/// away when that already happened.
pub(super) fn announce_ready_when_loaded(window: &Window, document: &Document) -> Result<(), String> {
    if document.ready_state() != web_sys::DocumentReadyState::Loading {
        announce_ready(window);
        return Ok(());
    }

    let ready_window = window.clone();
    let callback = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(move |_event| {
        announce_ready(&ready_window);
    }));
    document
        .add_event_listener_with_callback("DOMContentLoaded", callback.as_ref().unchecked_ref())
        .map_err(|_| "failed to attach DOMContentLoaded listener".to_string())?;
    READY_HANDLER.with(|slot| *slot.borrow_mut() = Some(callback));
    Ok(())
}

fn announce_ready(window: &Window) {
    if READY_SENT.with(|sent| sent.replace(true)) {
        return;
    }
    match web_sys::CustomEvent::new(READY_EVENT_NAME) {
        Ok(event) => {
            let _ = window.dispatch_event(&event);
        }
        Err(error) => tracing::warn!(?error, "failed to announce readiness"),
    }
}
