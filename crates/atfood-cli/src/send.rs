use std::rc::Rc;

use anyhow::{Context, Result, bail};
use atfood_client_core::{
    ActionRequest, ActionResponse, DispatchEngine, DispatchOptions, IdentityDefaults,
    IdentityOverrides, Page, RenderPipeline, Role, WidgetConfig, WidgetContext,
};
use clap::Args;
use serde_json::{Map, Value};

use crate::transport::ReqwestTransport;

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Action name, e.g. world_picks or adjust_recipe
    pub action: String,
    /// Endpoint URL (defaults to $ATFOOD_ENDPOINT_URL, then the local backend)
    #[arg(long)]
    pub endpoint: Option<String>,
    /// Token header value (defaults to $ATFOOD_TOKEN)
    #[arg(long)]
    pub token: Option<String>,
    /// User header value (defaults to $ATFOOD_USER)
    #[arg(long)]
    pub user: Option<String>,
    /// Session id (defaults to $ATFOOD_SESSION_ID)
    #[arg(long)]
    pub session: Option<String>,
    /// Recipe id for recipe-scoped actions
    #[arg(long)]
    pub recipe: Option<String>,
    /// Critic topic for critic_notes
    #[arg(long)]
    pub topic: Option<String>,
    /// Free text, as typed into the widget input
    #[arg(long)]
    pub text: Option<String>,
    /// Preference as key=value; the value is parsed as JSON when possible
    #[arg(long = "pref", value_name = "KEY=VALUE")]
    pub prefs: Vec<String>,
    /// Print the raw response text and usage metrics instead of the transcript
    #[arg(long)]
    pub raw: bool,
}

pub async fn run(args: SendArgs) -> Result<()> {
    let config = match args.endpoint.as_deref() {
        Some(endpoint) => WidgetConfig::new(endpoint)
            .with_context(|| format!("invalid --endpoint {endpoint}"))?,
        None => WidgetConfig::from_env().context("invalid ATFOOD_ENDPOINT_URL")?,
    };
    let defaults = IdentityDefaults::from_env();
    let request = build_request(&args, &defaults)?;
    let overrides = IdentityOverrides {
        token: args.token,
        user: args.user,
        session_id: args.session,
    };

    let mount_point_id = config.mount_point_id.clone();
    let context = Rc::new(WidgetContext::new(config, defaults));
    let page = Rc::new(Page::new());
    page.add_mount_point(&mount_point_id, false);
    let engine = DispatchEngine::new(
        context,
        Rc::clone(&page),
        ReqwestTransport::new(),
        RenderPipeline::default(),
    );

    let response = engine
        .send_action(
            request,
            DispatchOptions {
                identity: overrides,
                ..DispatchOptions::default()
            },
        )
        .await;

    if args.raw {
        if let Some(response) = &response {
            print_raw(response);
        }
    } else {
        print_transcript(&page, &mount_point_id);
    }

    if response.is_none() {
        bail!("action {} failed; rerun with RUST_LOG=debug for details", args.action);
    }
    Ok(())
}

fn build_request(args: &SendArgs, defaults: &IdentityDefaults) -> Result<ActionRequest> {
    let action = args.action.trim();
    if action.is_empty() {
        bail!("action must not be empty");
    }
    let mut request = ActionRequest::new(action);
    request.user_text = args.text.clone();
    request.recipe_id = args.recipe.clone();
    request.critic_topic = args.topic.clone();
    request.session_id = args
        .session
        .clone()
        .or_else(|| defaults.session_id.clone());
    if !args.prefs.is_empty() {
        request.prefs = Some(parse_prefs(&args.prefs)?);
    }
    Ok(request)
}

pub(crate) fn parse_prefs(raw: &[String]) -> Result<Map<String, Value>> {
    let mut prefs = Map::new();
    for entry in raw {
        let (key, value) = entry
            .split_once('=')
            .with_context(|| format!("--pref {entry} is not key=value"))?;
        let key = key.trim();
        if key.is_empty() {
            bail!("--pref {entry} has an empty key");
        }
        let value = serde_json::from_str(value.trim())
            .unwrap_or_else(|_| Value::String(value.trim().to_string()));
        prefs.insert(key.to_string(), value);
    }
    Ok(prefs)
}

fn print_transcript(page: &Page, mount_point_id: &str) {
    for message in page.messages(mount_point_id) {
        let speaker = match message.role {
            Role::User => "you",
            Role::Assistant => "atfood",
        };
        let text = message.text_content();
        let text = text.strip_prefix("ATFOOD:").map_or(text.as_str(), str::trim_start);
        println!("{speaker}> {text}");
    }
}

fn print_raw(response: &ActionResponse) {
    println!("{}", response.text);
    let metric = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());
    println!(
        "prompt_tokens={} response_tokens={} total_cost={}",
        metric(response.prompt_tokens.map(|tokens| tokens.to_string())),
        metric(response.response_tokens.map(|tokens| tokens.to_string())),
        metric(response.total_cost.as_ref().map(|cost| match cost {
            Value::String(cost) => cost.clone(),
            other => other.to_string(),
        })),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(action: &str) -> SendArgs {
        SendArgs {
            action: action.to_string(),
            endpoint: None,
            token: None,
            user: None,
            session: None,
            recipe: None,
            topic: None,
            text: None,
            prefs: Vec::new(),
            raw: false,
        }
    }

    #[test]
    fn prefs_parse_json_values_and_fall_back_to_strings() {
        let prefs = parse_prefs(&[
            "spice=3".to_string(),
            "vegan=true".to_string(),
            "cuisine = sichuan".to_string(),
        ])
        .expect("valid prefs");
        assert_eq!(Value::Object(prefs), json!({"spice": 3, "vegan": true, "cuisine": "sichuan"}));
    }

    #[test]
    fn prefs_reject_missing_separator_and_empty_key() {
        assert!(parse_prefs(&["spicy".to_string()]).is_err());
        assert!(parse_prefs(&["=3".to_string()]).is_err());
    }

    #[test]
    fn request_uses_flag_session_before_default() {
        let defaults = IdentityDefaults {
            session_id: Some("env-session".into()),
            ..IdentityDefaults::default()
        };
        let mut send = args("critic_notes");
        send.topic = Some("gas station sushi".into());
        let request = build_request(&send, &defaults).expect("request");
        assert_eq!(request.session_id.as_deref(), Some("env-session"));
        assert_eq!(request.critic_topic.as_deref(), Some("gas station sushi"));
        assert_eq!(request.prefs, None);

        send.session = Some("flag-session".into());
        let request = build_request(&send, &defaults).expect("request");
        assert_eq!(request.session_id.as_deref(), Some("flag-session"));
    }

    #[test]
    fn blank_action_is_rejected() {
        assert!(build_request(&args("  "), &IdentityDefaults::default()).is_err());
    }
}
