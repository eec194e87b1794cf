//! Declarative triggers: elements carrying `data-atfood-*` attributes.

use std::cell::Cell;

use crate::error::WidgetError;
use crate::identity::{AttributeSource, IdentityDefaults, resolve_session_id};
use crate::request::ActionRequest;
use crate::transcript::TextInput;

pub const ACTION_ATTRIBUTE: &str = "data-atfood-action";
pub const RECIPE_ATTRIBUTE: &str = "data-atfood-recipe";
pub const TOPIC_ATTRIBUTE: &str = "data-atfood-topic";

/// An element that can be walked towards the document root.
pub trait TriggerElement: AttributeSource + Sized {
    fn parent_element(&self) -> Option<Self>;
}

/// Nearest element, starting at `target` itself, that carries a non-blank
/// action attribute.
pub fn closest_trigger<E: TriggerElement>(target: E) -> Option<E> {
    let mut current = Some(target);
    while let Some(element) = current {
        if element
            .attribute(ACTION_ATTRIBUTE)
            .is_some_and(|action| !action.trim().is_empty())
        {
            return Some(element);
        }
        current = element.parent_element();
    }
    None
}

/// Typed view of a trigger's attributes. Blank attributes read as `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerParams {
    pub action: String,
    pub recipe_id: Option<String>,
    pub critic_topic: Option<String>,
}

impl TriggerParams {
    /// `None` when the element has no usable action.
    pub fn extract(element: &dyn AttributeSource) -> Option<Self> {
        Some(Self {
            action: read(element, ACTION_ATTRIBUTE)?,
            recipe_id: read(element, RECIPE_ATTRIBUTE),
            critic_topic: read(element, TOPIC_ATTRIBUTE),
        })
    }

    /// An empty `session_id` is sent as `null`.
    pub fn into_request(self, user_text: Option<String>, session_id: String) -> ActionRequest {
        ActionRequest {
            action: self.action,
            user_text,
            recipe_id: self.recipe_id,
            critic_topic: self.critic_topic,
            session_id: Some(session_id).filter(|session_id| !session_id.is_empty()),
            prefs: None,
        }
    }
}

fn read(element: &dyn AttributeSource, name: &str) -> Option<String> {
    element
        .attribute(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// A recognized click: the trigger element and the request assembled from it.
#[derive(Debug)]
pub struct TriggerDispatch<E> {
    pub trigger: E,
    pub request: ActionRequest,
}

/// Guard for the single document-wide click binding.
#[derive(Debug, Default)]
pub struct TriggerBinding {
    installed: Cell<bool>,
}

impl TriggerBinding {
    pub const fn new() -> Self {
        Self {
            installed: Cell::new(false),
        }
    }

    /// Marks the binding installed. A second call fails so the caller does not
    /// attach a second listener.
    pub fn install(&self) -> Result<(), WidgetError> {
        if self.installed.replace(true) {
            tracing::warn!("document click binding already installed; ignoring");
            return Err(WidgetError::BindingAlreadyInstalled);
        }
        Ok(())
    }

    pub fn is_installed(&self) -> bool {
        self.installed.get()
    }

    /// Turns a click on `target` into a request, or `None` when no trigger
    /// encloses it. Reading the free-text input clears it.
    pub fn recognize<E: TriggerElement>(
        &self,
        target: E,
        input: &dyn TextInput,
        input_id: &str,
        defaults: &IdentityDefaults,
    ) -> Option<TriggerDispatch<E>> {
        let trigger = closest_trigger(target)?;
        let params = TriggerParams::extract(&trigger)?;
        let user_text = input.take_text(input_id);
        let session_id = resolve_session_id(Some(&trigger), defaults);

        tracing::debug!(
            action = %params.action,
            has_text = user_text.is_some(),
            "recognized trigger click"
        );
        let request = params.into_request(user_text, session_id);
        Some(TriggerDispatch { trigger, request })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::SESSION_ATTRIBUTE;
    use crate::page::Page;

    #[test]
    fn nested_click_resolves_to_nearest_trigger() {
        let page = Page::new();
        let outer = page.add_element("section", None);
        page.set_attribute(outer, ACTION_ATTRIBUTE, "food_era");
        let button = page.add_element("button", Some(outer));
        page.set_attribute(button, ACTION_ATTRIBUTE, "adjust_recipe");
        let icon = page.add_element("span", Some(button));

        let trigger = closest_trigger(page.element(icon)).expect("trigger found");
        assert_eq!(trigger.id(), button);
    }

    #[test]
    fn blank_action_is_not_a_trigger() {
        let page = Page::new();
        let outer = page.add_element("div", None);
        page.set_attribute(outer, ACTION_ATTRIBUTE, "   ");
        let inner = page.add_element("span", Some(outer));
        assert!(closest_trigger(page.element(inner)).is_none());
    }

    #[test]
    fn extract_reads_typed_params() {
        let page = Page::new();
        let button = page.add_element("button", None);
        page.set_attribute(button, ACTION_ATTRIBUTE, "adjust_recipe");
        page.set_attribute(button, RECIPE_ATTRIBUTE, "silky_tomato_soup");
        page.set_attribute(button, TOPIC_ATTRIBUTE, "");

        let params = TriggerParams::extract(&page.element(button)).expect("has action");
        assert_eq!(
            params,
            TriggerParams {
                action: "adjust_recipe".into(),
                recipe_id: Some("silky_tomato_soup".into()),
                critic_topic: None,
            }
        );
    }

    #[test]
    fn recognize_assembles_request_and_clears_input() {
        let page = Page::new();
        page.add_text_input("atfood-ai-input");
        page.set_input_value("atfood-ai-input", " spicy please ");
        let button = page.add_element("a", None);
        page.set_attribute(button, ACTION_ATTRIBUTE, "critic_notes");
        page.set_attribute(button, TOPIC_ATTRIBUTE, "airport food");
        page.set_attribute(button, SESSION_ATTRIBUTE, "s-42");
        let label = page.add_element("em", Some(button));

        let binding = TriggerBinding::new();
        let dispatch = binding
            .recognize(
                page.element(label),
                &page,
                "atfood-ai-input",
                &IdentityDefaults::default(),
            )
            .expect("click recognized");

        assert_eq!(dispatch.trigger.id(), button);
        assert_eq!(dispatch.request.action, "critic_notes");
        assert_eq!(dispatch.request.user_text.as_deref(), Some("spicy please"));
        assert_eq!(dispatch.request.critic_topic.as_deref(), Some("airport food"));
        assert_eq!(dispatch.request.session_id.as_deref(), Some("s-42"));
        assert_eq!(page.input_value("atfood-ai-input").as_deref(), Some(""));
    }

    #[test]
    fn click_outside_triggers_leaves_input_alone() {
        let page = Page::new();
        page.add_text_input("atfood-ai-input");
        page.set_input_value("atfood-ai-input", "keep me");
        let plain = page.add_element("p", None);

        let binding = TriggerBinding::new();
        let dispatch = binding.recognize(
            page.element(plain),
            &page,
            "atfood-ai-input",
            &IdentityDefaults::default(),
        );
        assert!(dispatch.is_none());
        assert_eq!(page.input_value("atfood-ai-input").as_deref(), Some("keep me"));
    }

    #[test]
    fn binding_installs_once() {
        let binding = TriggerBinding::new();
        assert!(!binding.is_installed());
        binding.install().expect("first install");
        assert_eq!(binding.install(), Err(WidgetError::BindingAlreadyInstalled));
        assert!(binding.is_installed());
    }
}
