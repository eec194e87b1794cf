use super::*;

const MESSAGE_CLASS: &str = "atfood-msg";

/// Transcript surface over the live document.
pub(super) struct DomSurface {
    document: Document,
}

pub(super) struct DomChat {
    mount: Element,
    list: Element,
}

/// A message element. A detached element is still a valid handle; writes to it
/// simply never show up.
pub(super) struct DomMessage {
    element: Element,
}

impl DomMessage {
    pub(super) fn element(&self) -> &Element {
        &self.element
    }
}

impl DomSurface {
    pub(super) fn new(document: Document) -> Self {
        Self { document }
    }

    pub(super) fn document(&self) -> &Document {
        &self.document
    }

    fn build_chat(&self, mount: &Element) -> Result<Element, JsValue> {
        let container = self.document.create_element("div")?;
        container.set_class_name(CHAT_CONTAINER_CLASS);
        let list = self.document.create_element("div")?;
        list.set_class_name(MESSAGE_LIST_CLASS);
        container.append_child(&list)?;

        mount.set_inner_html("");
        mount.append_child(&container)?;
        Ok(list)
    }
}

impl TranscriptSurface for DomSurface {
    type Chat = DomChat;
    type Handle = DomMessage;

    fn ensure_chat(&self, mount_point_id: &str) -> Option<DomChat> {
        let mount = self.document.get_element_by_id(mount_point_id)?;
        let selector = format!(":scope > .{CHAT_CONTAINER_CLASS} > .{MESSAGE_LIST_CLASS}");
        if let Ok(Some(list)) = mount.query_selector(&selector) {
            return Some(DomChat { mount, list });
        }

        match self.build_chat(&mount) {
            Ok(list) => Some(DomChat { mount, list }),
            Err(error) => {
                tracing::warn!(mount_point_id, ?error, "failed to build chat container");
                None
            }
        }
    }

    fn append_message(&self, chat: &DomChat, message: TranscriptMessage) -> Option<DomMessage> {
        let element = self.document.create_element("div").ok()?;
        element.set_class_name(&format!(
            "{MESSAGE_CLASS} {MESSAGE_CLASS}-{}",
            message.role.as_str()
        ));
        if message.is_markup {
            element.set_inner_html(&message.content);
        } else {
            element.set_text_content(Some(&message.content));
        }
        chat.list.append_child(&element).ok()?;

        let mount = &chat.mount;
        if mount.scroll_height() > mount.client_height() {
            mount.set_scroll_top(mount.scroll_height());
        }
        Some(DomMessage { element })
    }

    fn replace_pending(&self, handle: DomMessage, markup: &str) {
        handle.element.set_inner_html(markup);
    }

    fn scroll_into_view(&self, mount_point_id: &str) {
        if let Some(mount) = self.document.get_element_by_id(mount_point_id) {
            mount.scroll_into_view();
        }
    }
}

impl TextInput for DomSurface {
    fn take_text(&self, input_id: &str) -> Option<String> {
        let element = self.document.get_element_by_id(input_id)?;
        let raw = if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
            let value = input.value();
            input.set_value("");
            value
        } else if let Some(area) = element.dyn_ref::<HtmlTextAreaElement>() {
            let value = area.value();
            area.set_value("");
            value
        } else {
            return None;
        };

        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

#[derive(Clone)]
pub(super) struct DomElement(pub(super) Element);

impl DomElement {
    /// Click targets can be text nodes; those resolve to their parent element.
    pub(super) fn from_event_target(target: web_sys::EventTarget) -> Option<Self> {
        match target.dyn_into::<Element>() {
            Ok(element) => Some(Self(element)),
            Err(target) => target
                .dyn_into::<Node>()
                .ok()
                .and_then(|node| node.parent_element())
                .map(Self),
        }
    }
}

impl AttributeSource for DomElement {
    fn attribute(&self, name: &str) -> Option<String> {
        self.0.get_attribute(name)
    }
}

impl TriggerElement for DomElement {
    fn parent_element(&self) -> Option<Self> {
        self.0.parent_element().map(Self)
    }
}
