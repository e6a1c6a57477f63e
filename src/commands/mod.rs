//! Invocation handlers.
//!
//! The page shell sends one invocation per UI event (`{"command": ...,
//! "payload": ...}`); each handler mutates the storefront and returns a JSON
//! object. The host merges every reply with the freshly rendered regions.

pub mod cart;
pub mod menu;
pub mod orders;
pub mod reviews;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::StorefrontConfig;
use crate::menu::MenuSource;
use crate::storefront::{PendingOrder, Storefront};

#[derive(Debug, Clone, Deserialize)]
pub struct Invocation {
    pub command: String,
    #[serde(default)]
    pub payload: Value,
    /// Echoed back so the shell can correlate replies.
    #[serde(default)]
    pub id: Option<Value>,
}

/// What a handler produced.
pub enum CommandOutcome {
    Reply(Result<Value, String>),
    /// A checkout passed its guard; the host sends it in the background and
    /// replies immediately.
    Submit { pending: PendingOrder, reply: Value },
    /// The host loads the menu in the background and answers once
    /// [`menu::apply_menu_reload`] has run.
    Reload { source: MenuSource },
}

pub fn dispatch(
    sf: &mut Storefront,
    config: &StorefrontConfig,
    invocation: &Invocation,
) -> CommandOutcome {
    debug!(command = %invocation.command, "dispatching invocation");
    let payload = invocation.payload.clone();
    match invocation.command.as_str() {
        "page_load" => CommandOutcome::Reply(Ok(serde_json::json!({}))),
        "banner_dismiss" => {
            sf.dismiss_banner();
            CommandOutcome::Reply(Ok(serde_json::json!({})))
        }
        "cart_add" => CommandOutcome::Reply(cart::cart_add(sf, payload)),
        "cart_remove" => CommandOutcome::Reply(cart::cart_remove(sf, payload)),
        "review_submit" => CommandOutcome::Reply(reviews::review_submit(sf, payload)),
        "menu_reload" => CommandOutcome::Reload {
            source: config.menu_source.clone(),
        },
        "order_submit" => orders::order_submit(sf, payload),
        other => {
            warn!(command = %other, "unknown invocation");
            CommandOutcome::Reply(Err(format!("Unknown command: {other}")))
        }
    }
}

/// Merge a handler result with the rendered page into one reply object.
pub fn build_reply(sf: &Storefront, id: Option<&Value>, result: Result<Value, String>) -> Value {
    let mut reply = serde_json::Map::new();
    if let Some(id) = id {
        reply.insert("id".to_string(), id.clone());
    }
    match result {
        Ok(Value::Object(fields)) => {
            reply.insert("success".to_string(), Value::Bool(true));
            for (k, v) in fields {
                reply.insert(k, v);
            }
        }
        Ok(Value::Null) => {
            reply.insert("success".to_string(), Value::Bool(true));
        }
        Ok(other) => {
            reply.insert("success".to_string(), Value::Bool(true));
            reply.insert("data".to_string(), other);
        }
        Err(error) => {
            reply.insert("success".to_string(), Value::Bool(false));
            reply.insert("error".to_string(), Value::String(error));
        }
    }
    reply.insert(
        "submission".to_string(),
        serde_json::to_value(sf.submission_state()).unwrap_or(Value::Null),
    );
    reply.insert(
        "regions".to_string(),
        serde_json::to_value(sf.render()).unwrap_or_else(|_| serde_json::json!({})),
    );
    Value::Object(reply)
}

/// Accept either a bare string payload or an object carrying one of `keys`.
pub(crate) fn payload_string(payload: &Value, keys: &[&str]) -> Option<String> {
    match payload {
        Value::String(s) => {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        }
        Value::Object(_) => crate::value_str(payload, keys),
        _ => None,
    }
}
