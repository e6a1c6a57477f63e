//! Invocation host: reads JSON-line invocations, dispatches them against the
//! storefront, and writes JSON-line replies and events.
//!
//! Order submissions and menu reloads run on spawned tasks so the page keeps
//! answering other invocations while they are in flight. Their outcomes come
//! back over a channel and are applied on this task, which is the only one
//! that ever touches the storefront.

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::commands::{self, build_reply, CommandOutcome, Invocation};
use crate::config::StorefrontConfig;
use crate::menu::{load_menu, Menu, MenuSource};
use crate::order::{send_order, OrderError, OrderTransport};
use crate::storefront::Storefront;

/// Result of a background task, applied on the host task.
enum Completion {
    Order(Uuid, Result<(), OrderError>),
    Menu {
        id: Option<Value>,
        source: MenuSource,
        loaded: Result<Menu, String>,
    },
}

async fn emit<W: AsyncWrite + Unpin>(writer: &mut W, value: &Value) -> std::io::Result<()> {
    let mut line = value.to_string();
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}

fn order_result_event(
    sf: &Storefront,
    order_id: Uuid,
    outcome: &Result<(), OrderError>,
    reset_form: bool,
) -> Value {
    let mut event = build_reply(
        sf,
        None,
        match outcome {
            Ok(()) => Ok(serde_json::json!({})),
            Err(err) => Err(err.user_message()),
        },
    );
    if let Value::Object(map) = &mut event {
        map.insert("event".to_string(), Value::String("order_result".to_string()));
        map.insert("orderId".to_string(), Value::String(order_id.to_string()));
        map.insert("resetForm".to_string(), Value::Bool(reset_form));
        if let Err(OrderError::Rejected { status, .. }) = outcome {
            map.insert("httpStatus".to_string(), Value::from(*status));
        }
    }
    event
}

fn apply_completion(sf: &mut Storefront, completion: Completion) -> Value {
    match completion {
        Completion::Order(order_id, outcome) => {
            let reset_form = sf.finish_checkout(order_id, outcome.clone());
            order_result_event(sf, order_id, &outcome, reset_form)
        }
        Completion::Menu { id, source, loaded } => {
            let result = commands::menu::apply_menu_reload(sf, &source, loaded);
            build_reply(sf, id.as_ref(), result)
        }
    }
}

/// Serve invocations until the reader reaches EOF. Emits the initial
/// `page_load` event first, and waits for in-flight orders and menu reloads
/// before returning. A `menu_reload` reply is written when the load
/// finishes, so it can follow replies to later invocations.
pub async fn serve<R, W, T>(
    reader: R,
    mut writer: W,
    mut sf: Storefront,
    config: StorefrontConfig,
    transport: T,
) -> std::io::Result<Storefront>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    T: OrderTransport + Clone + Send + Sync + 'static,
{
    let mut initial = build_reply(&sf, None, Ok(serde_json::json!({})));
    if let Value::Object(map) = &mut initial {
        map.insert("event".to_string(), Value::String("page_load".to_string()));
    }
    emit(&mut writer, &initial).await?;

    let (tx, mut rx) = mpsc::unbounded_channel::<Completion>();
    let mut lines = reader.lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        error!(error = %e, "failed to read invocation stream");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                let invocation: Invocation = match serde_json::from_str(&line) {
                    Ok(inv) => inv,
                    Err(e) => {
                        warn!(error = %e, "malformed invocation");
                        let reply = build_reply(&sf, None, Err(format!("Malformed invocation: {e}")));
                        emit(&mut writer, &reply).await?;
                        continue;
                    }
                };

                match commands::dispatch(&mut sf, &config, &invocation) {
                    CommandOutcome::Reply(result) => {
                        let reply = build_reply(&sf, invocation.id.as_ref(), result);
                        emit(&mut writer, &reply).await?;
                    }
                    CommandOutcome::Submit { pending, reply } => {
                        let transport = transport.clone();
                        let endpoint = config.form_endpoint.clone();
                        let tx = tx.clone();
                        tokio::spawn(async move {
                            let outcome =
                                send_order(&transport, &endpoint, pending.order_id, pending.fields).await;
                            if tx.send(Completion::Order(pending.order_id, outcome)).is_err() {
                                warn!(order_id = %pending.order_id, "host stopped before order completed");
                            }
                        });
                        let reply = build_reply(&sf, invocation.id.as_ref(), Ok(reply));
                        emit(&mut writer, &reply).await?;
                    }
                    CommandOutcome::Reload { source } => {
                        let tx = tx.clone();
                        let id = invocation.id.clone();
                        tokio::spawn(async move {
                            let loaded = load_menu(&source).await;
                            if tx.send(Completion::Menu { id, source, loaded }).is_err() {
                                warn!("host stopped before menu reload completed");
                            }
                        });
                    }
                }
            }
            Some(completion) = rx.recv() => {
                let event = apply_completion(&mut sf, completion);
                emit(&mut writer, &event).await?;
            }
        }
    }

    // Each background task holds a sender; the channel closes once all finish
    drop(tx);
    debug!("input closed, draining background tasks");
    while let Some(completion) = rx.recv().await {
        let event = apply_completion(&mut sf, completion);
        emit(&mut writer, &event).await?;
    }

    info!("invocation stream closed");
    Ok(sf)
}
