//! Headless in-memory page.
//!
//! A minimal element tree (ids, attributes, parents, input values) plus mount
//! points that hold either foreign content or one chat container. It backs the
//! CLI host and every test that needs a transcript without a browser.

use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::identity::AttributeSource;
use crate::transcript::{Role, TextInput, TranscriptMessage, TranscriptSurface};
use crate::trigger::TriggerElement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(usize);

/// An ensured chat: the mount point plus the container generation it was
/// built as. Two equal values refer to the same container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageChat {
    mount: ElementId,
    container_id: u64,
}

/// One appended message. Not `Clone`; replacing consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct PageMessage {
    mount: ElementId,
    container_id: u64,
    index: usize,
}

impl PageMessage {
    pub fn index(&self) -> usize {
        self.index
    }
}

#[derive(Debug, Default)]
pub struct Page {
    inner: RefCell<PageInner>,
}

#[derive(Debug, Default)]
struct PageInner {
    elements: Vec<ElementNode>,
    next_container_id: u64,
}

#[derive(Debug)]
struct ElementNode {
    tag: String,
    dom_id: Option<String>,
    attributes: BTreeMap<String, String>,
    parent: Option<ElementId>,
    value: Option<String>,
    mount: Option<MountState>,
}

#[derive(Debug, Default)]
struct MountState {
    content: MountContent,
    scrollable: bool,
    scroll_index: Option<usize>,
    reveals: usize,
}

#[derive(Debug, Default)]
enum MountContent {
    #[default]
    Empty,
    Foreign(String),
    Chat(ChatContainer),
}

#[derive(Debug)]
struct ChatContainer {
    container_id: u64,
    messages: Vec<TranscriptMessage>,
}

impl PageInner {
    fn find(&self, dom_id: &str) -> Option<ElementId> {
        self.elements
            .iter()
            .position(|node| node.dom_id.as_deref() == Some(dom_id))
            .map(ElementId)
    }

    fn chat_mut(&mut self, mount: ElementId, container_id: u64) -> Option<&mut ChatContainer> {
        let state = self.elements.get_mut(mount.0)?.mount.as_mut()?;
        match &mut state.content {
            MountContent::Chat(chat) if chat.container_id == container_id => Some(chat),
            _ => None,
        }
    }

    fn mount(&self, dom_id: &str) -> Option<&MountState> {
        let id = self.find(dom_id)?;
        self.elements.get(id.0)?.mount.as_ref()
    }
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_element(&self, tag: &str, parent: Option<ElementId>) -> ElementId {
        let mut inner = self.inner.borrow_mut();
        inner.elements.push(ElementNode {
            tag: tag.to_ascii_lowercase(),
            dom_id: None,
            attributes: BTreeMap::new(),
            parent,
            value: None,
            mount: None,
        });
        ElementId(inner.elements.len() - 1)
    }

    pub fn set_element_id(&self, element: ElementId, dom_id: &str) {
        if let Some(node) = self.inner.borrow_mut().elements.get_mut(element.0) {
            node.dom_id = Some(dom_id.to_string());
        }
    }

    pub fn set_attribute(&self, element: ElementId, name: &str, value: &str) {
        if let Some(node) = self.inner.borrow_mut().elements.get_mut(element.0) {
            node.attributes
                .insert(name.to_ascii_lowercase(), value.to_string());
        }
    }

    pub fn add_mount_point(&self, dom_id: &str, scrollable: bool) -> ElementId {
        let element = self.add_element("div", None);
        self.set_element_id(element, dom_id);
        if let Some(node) = self.inner.borrow_mut().elements.get_mut(element.0) {
            node.mount = Some(MountState {
                scrollable,
                ..MountState::default()
            });
        }
        element
    }

    /// Puts non-chat content into a mount point, as a host page might.
    pub fn set_foreign_content(&self, dom_id: &str, html: &str) {
        let mut inner = self.inner.borrow_mut();
        let Some(id) = inner.find(dom_id) else {
            return;
        };
        if let Some(node) = inner.elements.get_mut(id.0) {
            node.mount.get_or_insert_with(MountState::default).content =
                MountContent::Foreign(html.to_string());
        }
    }

    pub fn add_text_input(&self, dom_id: &str) -> ElementId {
        let element = self.add_element("input", None);
        self.set_element_id(element, dom_id);
        if let Some(node) = self.inner.borrow_mut().elements.get_mut(element.0) {
            node.value = Some(String::new());
        }
        element
    }

    pub fn set_input_value(&self, dom_id: &str, value: &str) {
        let mut inner = self.inner.borrow_mut();
        let Some(id) = inner.find(dom_id) else {
            return;
        };
        if let Some(node) = inner.elements.get_mut(id.0) {
            node.value = Some(value.to_string());
        }
    }

    pub fn input_value(&self, dom_id: &str) -> Option<String> {
        let inner = self.inner.borrow();
        let id = inner.find(dom_id)?;
        inner.elements.get(id.0)?.value.clone()
    }

    pub fn element(&self, element: ElementId) -> PageElement<'_> {
        PageElement {
            page: self,
            id: element,
        }
    }

    pub fn element_by_id(&self, dom_id: &str) -> Option<PageElement<'_>> {
        let id = self.inner.borrow().find(dom_id)?;
        Some(self.element(id))
    }

    /// Messages of the chat currently under `dom_id`, in display order.
    pub fn messages(&self, dom_id: &str) -> Vec<TranscriptMessage> {
        match self.inner.borrow().mount(dom_id).map(|state| &state.content) {
            Some(MountContent::Chat(chat)) => chat.messages.clone(),
            _ => Vec::new(),
        }
    }

    pub fn chat_container_id(&self, dom_id: &str) -> Option<u64> {
        match self.inner.borrow().mount(dom_id).map(|state| &state.content) {
            Some(MountContent::Chat(chat)) => Some(chat.container_id),
            _ => None,
        }
    }

    pub fn foreign_content(&self, dom_id: &str) -> Option<String> {
        match self.inner.borrow().mount(dom_id).map(|state| &state.content) {
            Some(MountContent::Foreign(html)) => Some(html.clone()),
            _ => None,
        }
    }

    /// Index of the message the mount point was last scrolled to.
    pub fn scroll_index(&self, dom_id: &str) -> Option<usize> {
        self.inner
            .borrow()
            .mount(dom_id)
            .and_then(|state| state.scroll_index)
    }

    /// How many times the mount point was scrolled into view.
    pub fn reveal_count(&self, dom_id: &str) -> usize {
        self.inner
            .borrow()
            .mount(dom_id)
            .map_or(0, |state| state.reveals)
    }
}

impl TranscriptSurface for Page {
    type Chat = PageChat;
    type Handle = PageMessage;

    fn ensure_chat(&self, mount_point_id: &str) -> Option<PageChat> {
        let mut inner = self.inner.borrow_mut();
        let mount = inner.find(mount_point_id)?;
        let next_container_id = inner.next_container_id;
        let node = inner.elements.get_mut(mount.0)?;
        let state = node.mount.get_or_insert_with(MountState::default);

        if let MountContent::Chat(chat) = &state.content {
            return Some(PageChat {
                mount,
                container_id: chat.container_id,
            });
        }

        if matches!(state.content, MountContent::Foreign(_)) {
            tracing::debug!(mount_point_id, "replacing foreign mount point content with chat");
        }
        state.content = MountContent::Chat(ChatContainer {
            container_id: next_container_id,
            messages: Vec::new(),
        });
        state.scroll_index = None;
        inner.next_container_id += 1;
        Some(PageChat {
            mount,
            container_id: next_container_id,
        })
    }

    fn append_message(&self, chat: &PageChat, message: TranscriptMessage) -> Option<PageMessage> {
        let mut inner = self.inner.borrow_mut();
        let container = inner.chat_mut(chat.mount, chat.container_id)?;
        container.messages.push(message);
        let index = container.messages.len() - 1;

        if let Some(state) = inner
            .elements
            .get_mut(chat.mount.0)
            .and_then(|node| node.mount.as_mut())
        {
            if state.scrollable {
                state.scroll_index = Some(index);
            }
        }

        Some(PageMessage {
            mount: chat.mount,
            container_id: chat.container_id,
            index,
        })
    }

    fn replace_pending(&self, handle: PageMessage, markup: &str) {
        let mut inner = self.inner.borrow_mut();
        let Some(message) = inner
            .chat_mut(handle.mount, handle.container_id)
            .and_then(|chat| chat.messages.get_mut(handle.index))
        else {
            tracing::debug!(index = handle.index, "pending message is gone; skipping replace");
            return;
        };
        message.content = markup.to_string();
        message.is_markup = true;
        message.role = Role::Assistant;
    }

    fn scroll_into_view(&self, mount_point_id: &str) {
        let mut inner = self.inner.borrow_mut();
        let Some(mount) = inner.find(mount_point_id) else {
            return;
        };
        if let Some(state) = inner
            .elements
            .get_mut(mount.0)
            .and_then(|node| node.mount.as_mut())
        {
            state.reveals += 1;
        }
    }
}

impl TextInput for Page {
    fn take_text(&self, input_id: &str) -> Option<String> {
        let mut inner = self.inner.borrow_mut();
        let id = inner.find(input_id)?;
        let value = inner.elements.get_mut(id.0)?.value.as_mut()?;
        let text = std::mem::take(value);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

/// Borrowed view of one element of a [`Page`].
#[derive(Debug, Clone, Copy)]
pub struct PageElement<'a> {
    page: &'a Page,
    id: ElementId,
}

impl PageElement<'_> {
    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn tag(&self) -> String {
        self.page
            .inner
            .borrow()
            .elements
            .get(self.id.0)
            .map(|node| node.tag.clone())
            .unwrap_or_default()
    }
}

impl AttributeSource for PageElement<'_> {
    fn attribute(&self, name: &str) -> Option<String> {
        let inner = self.page.inner.borrow();
        let node = inner.elements.get(self.id.0)?;
        if name.eq_ignore_ascii_case("id") {
            return node.dom_id.clone();
        }
        node.attributes.get(&name.to_ascii_lowercase()).cloned()
    }
}

impl TriggerElement for PageElement<'_> {
    fn parent_element(&self) -> Option<Self> {
        let parent = self.page.inner.borrow().elements.get(self.id.0)?.parent?;
        Some(self.page.element(parent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_chat_is_idempotent() {
        let page = Page::new();
        page.add_mount_point("out", false);
        let first = page.ensure_chat("out").expect("mount exists");
        let second = page.ensure_chat("out").expect("mount exists");
        assert_eq!(first, second);
        assert_eq!(page.chat_container_id("out"), Some(0));
    }

    #[test]
    fn ensure_chat_replaces_foreign_content() {
        let page = Page::new();
        page.add_mount_point("out", false);
        page.set_foreign_content("out", "<p>Welcome to the kitchen</p>");
        assert!(page.ensure_chat("out").is_some());
        assert_eq!(page.foreign_content("out"), None);
        assert!(page.messages("out").is_empty());
    }

    #[test]
    fn ensure_chat_on_missing_mount_is_none() {
        let page = Page::new();
        assert!(page.ensure_chat("nowhere").is_none());
    }

    #[test]
    fn messages_keep_append_order_and_scroll_to_newest() {
        let page = Page::new();
        page.add_mount_point("out", true);
        let chat = page.ensure_chat("out").expect("mount exists");
        page.append_message(&chat, TranscriptMessage::user("first"));
        let pending = page
            .append_message(&chat, TranscriptMessage::pending())
            .expect("chat is live");
        assert_eq!(pending.index(), 1);
        assert_eq!(page.scroll_index("out"), Some(1));

        page.replace_pending(pending, "<strong>ATFOOD:</strong> done");
        let messages = page.messages("out");
        assert_eq!(messages[0].content, "first");
        assert_eq!(messages[1].content, "<strong>ATFOOD:</strong> done");
        assert!(messages[1].is_markup);
    }

    #[test]
    fn handle_from_replaced_container_is_ignored() {
        let page = Page::new();
        page.add_mount_point("out", false);
        let chat = page.ensure_chat("out").expect("mount exists");
        let pending = page
            .append_message(&chat, TranscriptMessage::pending())
            .expect("chat is live");

        page.set_foreign_content("out", "<p>host took over</p>");
        let rebuilt = page.ensure_chat("out").expect("mount exists");
        assert_ne!(rebuilt, chat);
        assert!(page.append_message(&chat, TranscriptMessage::user("stale")).is_none());

        page.replace_pending(pending, "late");
        assert!(page.messages("out").is_empty());
    }

    #[test]
    fn take_text_clears_and_trims() {
        let page = Page::new();
        page.add_text_input("atfood-ai-input");
        page.set_input_value("atfood-ai-input", "  ramen month \n");
        assert_eq!(page.take_text("atfood-ai-input").as_deref(), Some("ramen month"));
        assert_eq!(page.input_value("atfood-ai-input").as_deref(), Some(""));
        assert_eq!(page.take_text("atfood-ai-input"), None);
        assert_eq!(page.take_text("missing"), None);
    }

    #[test]
    fn elements_expose_attributes_and_parents() {
        let page = Page::new();
        let card = page.add_element("div", None);
        page.set_attribute(card, "data-atfood-action", "world_picks");
        let label = page.add_element("SPAN", Some(card));

        let element = page.element(label);
        assert_eq!(element.tag(), "span");
        assert_eq!(element.attribute("data-atfood-action"), None);
        let parent = element.parent_element().expect("has parent");
        assert_eq!(parent.id(), card);
        assert_eq!(
            parent.attribute("DATA-ATFOOD-ACTION").as_deref(),
            Some("world_picks")
        );
    }
}
