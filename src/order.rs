//! Order submission to the third-party form endpoint.
//!
//! An [`Order`] is a snapshot of the cart plus the checkout contact fields.
//! It is flattened into multipart form fields (with two computed fields,
//! `order_items` and `order_total`) and POSTed once. Success is decided by
//! HTTP status class only; the response body is read just to surface an
//! error message when the endpoint rejects the submission.

use chrono::{DateTime, Utc};
use reqwest::header::ACCEPT;
use reqwest::multipart::Form;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cart::Cart;
use crate::menu::Menu;
use crate::render::{cart_total, money, order_summary};
use crate::value_str;

/// Timeout for the order POST.
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

pub const EMPTY_CART_STATUS: &str = "Please add at least one item to your order.";
pub const SUBMITTING_STATUS: &str = "Submitting your order...";
pub const SUCCESS_STATUS: &str = "Order submitted! We will contact you shortly to confirm.";
pub const IN_FLIGHT_STATUS: &str = "Your order is already being submitted. Please wait.";
pub const REJECTED_STATUS: &str = "Sorry, we could not submit your order. Please try again.";
pub const NETWORK_ERROR_STATUS: &str =
    "Network error: we could not reach the order service. Please check your connection and try again.";

/// Checkout lifecycle. `Submitting` doubles as the re-entrancy guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionState {
    Idle,
    Submitting,
    Success,
    Failed,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("an order submission is already in flight")]
    InFlight,
    #[error("order endpoint rejected the submission (HTTP {status})")]
    Rejected {
        status: u16,
        message: Option<String>,
    },
    #[error("network error: {0}")]
    Network(String),
}

impl OrderError {
    /// Status text shown to the customer.
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyCart => EMPTY_CART_STATUS.to_string(),
            Self::InFlight => IN_FLIGHT_STATUS.to_string(),
            Self::Rejected {
                message: Some(message),
                ..
            } => format!("Sorry, we could not submit your order: {message}"),
            Self::Rejected { message: None, .. } => REJECTED_STATUS.to_string(),
            Self::Network(_) => NETWORK_ERROR_STATUS.to_string(),
        }
    }
}

/// The checkout form as the page submitted it. `customer`, `phone` and
/// `notes` are read through their common aliases for logging and the order
/// snapshot; `fields` holds every submitted field under its own name and is
/// what gets posted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutForm {
    pub customer: String,
    pub phone: String,
    pub notes: String,
    pub fields: Vec<(String, String)>,
}

const NAME_KEYS: &[&str] = &["name", "customer", "customer_name", "customerName"];
const PHONE_KEYS: &[&str] = &["phone", "customer_phone", "customerPhone"];
const NOTES_KEYS: &[&str] = &["notes", "order_notes", "orderNotes", "message"];
const COMPUTED_KEYS: &[&str] = &["order_items", "order_total"];

/// Flatten one payload value into form values. Arrays become repeated
/// fields, `null` is omitted.
fn field_values(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::String(s) => vec![s.clone()],
        Value::Bool(_) | Value::Number(_) => vec![value.to_string()],
        Value::Array(items) => items.iter().flat_map(field_values).collect(),
        Value::Object(_) => vec![value.to_string()],
    }
}

impl CheckoutForm {
    /// Read the form from an invocation payload object. Every field is kept
    /// under its own key except the computed order fields, which are never
    /// taken from the payload.
    pub fn from_payload(payload: &Value) -> Self {
        let mut fields = Vec::new();
        if let Some(obj) = payload.as_object() {
            for (key, value) in obj {
                if COMPUTED_KEYS.iter().any(|k| *k == key.as_str()) {
                    continue;
                }
                fields.extend(field_values(value).into_iter().map(|v| (key.clone(), v)));
            }
        }
        Self {
            customer: value_str(payload, NAME_KEYS).unwrap_or_default(),
            phone: value_str(payload, PHONE_KEYS).unwrap_or_default(),
            notes: value_str(payload, NOTES_KEYS).unwrap_or_default(),
            fields,
        }
    }
}

/// Snapshot of one checkout attempt.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: Uuid,
    pub customer: String,
    pub phone: String,
    pub notes: String,
    pub items: Cart,
    pub created_at: DateTime<Utc>,
    submitted: Vec<(String, String)>,
}

impl Order {
    pub fn new(form: CheckoutForm, cart: &Cart) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer: form.customer,
            phone: form.phone,
            notes: form.notes,
            items: cart.clone(),
            created_at: Utc::now(),
            submitted: form.fields,
        }
    }

    /// The submitted form fields followed by `order_items` and `order_total`.
    pub fn form_fields(&self, menu: &Menu, currency: &str) -> Vec<(String, String)> {
        let mut fields = self.submitted.clone();
        fields.push(("order_items".to_string(), order_summary(menu, &self.items)));
        fields.push((
            "order_total".to_string(),
            money(cart_total(menu, &self.items), currency),
        ));
        fields
    }
}

/// Raw outcome of the HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormResponse {
    pub status: u16,
    pub body: String,
}

/// Sends a multipart form POST. Implemented over reqwest in production and by
/// scripted fakes in tests.
pub trait OrderTransport {
    /// `Err` means the request never completed (transport failure).
    fn post_form(
        &self,
        endpoint: &str,
        fields: Vec<(String, String)>,
    ) -> impl Future<Output = Result<FormResponse, String>> + Send;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, String> {
        let client = Client::builder()
            .timeout(SUBMIT_TIMEOUT)
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {e}"))?;
        Ok(Self { client })
    }
}

/// Convert a `reqwest::Error` into a log-friendly message.
fn friendly_error(url: &str, err: &reqwest::Error) -> String {
    if err.is_connect() {
        return format!("Cannot reach order endpoint at {url}");
    }
    if err.is_timeout() {
        return format!("Connection to {url} timed out");
    }
    if err.is_builder() {
        return format!("Invalid order endpoint URL: {url}");
    }
    format!("Network error communicating with {url}: {err}")
}

impl OrderTransport for ReqwestTransport {
    fn post_form(
        &self,
        endpoint: &str,
        fields: Vec<(String, String)>,
    ) -> impl Future<Output = Result<FormResponse, String>> + Send {
        let client = self.client.clone();
        let endpoint = endpoint.to_string();
        async move {
            let form = fields
                .into_iter()
                .fold(Form::new(), |form, (key, value)| form.text(key, value));
            let resp = client
                .post(&endpoint)
                .header(ACCEPT, "application/json")
                .multipart(form)
                .send()
                .await
                .map_err(|e| friendly_error(&endpoint, &e))?;
            let status = resp.status().as_u16();
            // A body that cannot be read is treated as empty.
            let body = resp.text().await.unwrap_or_default();
            Ok(FormResponse { status, body })
        }
    }
}

/// Best-effort error message from a rejection body: `error`, `message`, or
/// the `errors[].message` list form-processing services return.
pub fn extract_error_message(body: &str) -> Option<String> {
    let json = serde_json::from_str::<Value>(body).ok()?;
    if let Some(message) = value_str(&json, &["error", "message"]) {
        return Some(message);
    }
    let messages: Vec<String> = json
        .get("errors")
        .and_then(Value::as_array)?
        .iter()
        .filter_map(|e| {
            e.as_str()
                .map(str::to_string)
                .or_else(|| value_str(e, &["message"]))
        })
        .collect();
    if messages.is_empty() {
        None
    } else {
        Some(messages.join("; "))
    }
}

/// POST the order fields and interpret the response by status class.
pub async fn send_order<T: OrderTransport>(
    transport: &T,
    endpoint: &str,
    order_id: Uuid,
    fields: Vec<(String, String)>,
) -> Result<(), OrderError> {
    let response = match transport.post_form(endpoint, fields).await {
        Ok(response) => response,
        Err(error) => {
            warn!(order_id = %order_id, error = %error, "order submission failed to complete");
            return Err(OrderError::Network(error));
        }
    };

    if (200..300).contains(&response.status) {
        info!(order_id = %order_id, status = response.status, "order submitted");
        return Ok(());
    }

    let message = extract_error_message(&response.body);
    warn!(
        order_id = %order_id,
        status = response.status,
        message = message.as_deref().unwrap_or(""),
        "order endpoint rejected submission"
    );
    Err(OrderError::Rejected {
        status: response.status,
        message,
    })
}
