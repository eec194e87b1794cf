use super::*;

thread_local! {
    static BINDING: TriggerBinding = const { TriggerBinding::new() };
    static CLICK_HANDLER: RefCell<Option<Closure<dyn FnMut(web_sys::Event)>>> =
        const { RefCell::new(None) };
}

/// Delegated click listener on the document, so triggers added after load are
/// picked up too. Installing twice is refused by the binding.
pub(super) fn install_click_binding(document: &Document) -> Result<(), String> {
    BINDING
        .with(TriggerBinding::install)
        .map_err(|error| error.to_string())?;

    let callback = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(on_document_click));
    document
        .add_event_listener_with_callback("click", callback.as_ref().unchecked_ref())
        .map_err(|_| "failed to attach click listener".to_string())?;
    CLICK_HANDLER.with(|slot| {
        *slot.borrow_mut() = Some(callback);
    });
    Ok(())
}

fn on_document_click(event: web_sys::Event) {
    let Some(target) = event.target().and_then(DomElement::from_event_target) else {
        return;
    };
    let Some(engine) = current_engine() else {
        return;
    };

    let context = engine.context();
    let dispatch = BINDING.with(|binding| {
        binding.recognize(
            target,
            engine.surface().as_ref(),
            &context.config().input_id,
            context.defaults(),
        )
    });
    let Some(dispatch) = dispatch else {
        return;
    };

    event.prevent_default();
    spawn_local(async move {
        if engine.dispatch_trigger(dispatch).await.is_none() {
            tracing::debug!("trigger dispatch settled without a response");
        }
    });
}
