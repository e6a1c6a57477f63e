//! The storefront store: menu, cart, reviews and checkout state behind one
//! owner. Every mutator persists before returning, and [`Storefront::render`]
//! rebuilds the page from whatever state is current.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::cart::{load_cart, save_cart, Cart};
use crate::db::DbState;
use crate::menu::Menu;
use crate::order::{
    send_order, CheckoutForm, Order, OrderError, OrderTransport, SubmissionState, SUBMITTING_STATUS,
    SUCCESS_STATUS,
};
use crate::render::{self, PageRegions};
use crate::reviews::{load_reviews, save_reviews, ReviewRejection, ReviewStore};
use crate::{delete_local_json, read_local_json, write_local_json};

pub(crate) const LAST_ORDER_KEY: &str = "last_order";

/// An order that passed the checkout guard and is ready to send.
#[derive(Debug, Clone)]
pub struct PendingOrder {
    pub order_id: Uuid,
    pub fields: Vec<(String, String)>,
}

pub struct Storefront {
    db: Arc<DbState>,
    currency: String,
    menu: Menu,
    cart: Cart,
    reviews: ReviewStore,
    submission: SubmissionState,
    in_flight: Option<Uuid>,
    order_status: String,
    banner: Option<String>,
}

fn confirmation_banner(placed_at: Option<DateTime<Utc>>) -> String {
    match placed_at {
        Some(at) => format!(
            "Thanks for your recent order placed {}! We will be in touch to confirm it.",
            at.format("%Y-%m-%d %H:%M UTC")
        ),
        None => "Thanks for your recent order! We will be in touch to confirm it.".to_string(),
    }
}

impl Storefront {
    /// Restore persisted cart and reviews, install the menu, and consume the
    /// one-shot last-order flag.
    pub fn init(db: Arc<DbState>, menu: Menu, currency: &str) -> Self {
        let cart = load_cart(&db);
        let reviews = load_reviews(&db);
        let banner = take_last_order_flag(&db);
        info!(
            menu_items = menu.len(),
            cart_lines = cart.len(),
            reviews = reviews.len(),
            returning_customer = banner.is_some(),
            "storefront initialised"
        );
        Self {
            db,
            currency: currency.to_string(),
            menu,
            cart,
            reviews,
            submission: SubmissionState::Idle,
            in_flight: None,
            order_status: String::new(),
            banner,
        }
    }

    pub fn menu(&self) -> &Menu {
        &self.menu
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn reviews(&self) -> &ReviewStore {
        &self.reviews
    }

    pub fn submission_state(&self) -> SubmissionState {
        self.submission
    }

    pub fn order_status(&self) -> &str {
        &self.order_status
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn cart_total(&self) -> f64 {
        render::cart_total(&self.menu, &self.cart)
    }

    /// Replace the menu. Cart lines that no longer resolve stay in the cart
    /// and are skipped by rendering and totals.
    pub fn replace_menu(&mut self, menu: Menu) {
        let dangling = self
            .cart
            .lines()
            .filter(|(id, _)| !menu.contains(id))
            .count();
        if dangling > 0 {
            warn!(dangling, "cart holds items missing from the new menu");
        }
        self.menu = menu;
    }

    pub fn add_to_cart(&mut self, item_id: &str) -> Result<(), String> {
        self.cart.add(item_id);
        debug!(item_id, qty = self.cart.quantity(item_id), "cart add");
        save_cart(&self.db, &self.cart)
    }

    /// Returns `Ok(false)` when the item was not in the cart; nothing is
    /// persisted in that case.
    pub fn remove_from_cart(&mut self, item_id: &str) -> Result<bool, String> {
        if !self.cart.remove(item_id) {
            debug!(item_id, "cart remove ignored, item not in cart");
            return Ok(false);
        }
        debug!(item_id, qty = self.cart.quantity(item_id), "cart remove");
        save_cart(&self.db, &self.cart)?;
        Ok(true)
    }

    /// Append a review. A rejected review leaves state untouched.
    pub fn submit_review(
        &mut self,
        reviewer: &str,
        rating: i64,
        message: &str,
    ) -> Result<Result<(), ReviewRejection>, String> {
        match self.reviews.append(reviewer, rating, message) {
            Ok(review) => {
                info!(rating = review.rating, "review added");
            }
            Err(rejection) => {
                debug!(reason = rejection.as_str(), "review dropped");
                return Ok(Err(rejection));
            }
        }
        save_reviews(&self.db, &self.reviews)?;
        Ok(Ok(()))
    }

    /// Move to `Submitting` and snapshot the order. Refused while another
    /// submission is in flight or when no cart line resolves against the
    /// menu; neither refusal changes the checkout state.
    pub fn begin_checkout(&mut self, form: CheckoutForm) -> Result<PendingOrder, OrderError> {
        if self.submission == SubmissionState::Submitting {
            warn!("checkout refused, submission already in flight");
            return Err(OrderError::InFlight);
        }
        if !self.cart.lines().any(|(id, _)| self.menu.contains(id)) {
            self.order_status = OrderError::EmptyCart.user_message();
            return Err(OrderError::EmptyCart);
        }

        let order = Order::new(form, &self.cart);
        let fields = order.form_fields(&self.menu, &self.currency);
        info!(
            order_id = %order.id,
            lines = order.items.len(),
            total = %render::money(render::cart_total(&self.menu, &order.items), &self.currency),
            "submitting order"
        );

        self.submission = SubmissionState::Submitting;
        self.in_flight = Some(order.id);
        self.order_status = SUBMITTING_STATUS.to_string();
        Ok(PendingOrder {
            order_id: order.id,
            fields,
        })
    }

    /// Apply the outcome of a submission. Returns `true` when the checkout
    /// form should be reset. Outcomes for an order that is not the one in
    /// flight are ignored.
    pub fn finish_checkout(&mut self, order_id: Uuid, outcome: Result<(), OrderError>) -> bool {
        if self.in_flight != Some(order_id) {
            warn!(order_id = %order_id, "ignoring outcome for unknown order");
            return false;
        }
        self.in_flight = None;

        match outcome {
            Ok(()) => {
                self.cart.clear();
                if let Err(e) = save_cart(&self.db, &self.cart) {
                    error!(order_id = %order_id, error = %e, "failed to persist cleared cart");
                }
                let placed_at = Value::String(Utc::now().to_rfc3339());
                if let Err(e) = write_local_json(&self.db, LAST_ORDER_KEY, &placed_at) {
                    warn!(error = %e, "failed to write last-order flag");
                }
                self.submission = SubmissionState::Success;
                self.order_status = SUCCESS_STATUS.to_string();
                true
            }
            Err(err) => {
                self.submission = SubmissionState::Failed;
                self.order_status = err.user_message();
                false
            }
        }
    }

    /// Run a whole checkout inline: guard, send, apply. Returns whether the
    /// form should be reset.
    pub async fn checkout<T: OrderTransport>(
        &mut self,
        transport: &T,
        endpoint: &str,
        form: CheckoutForm,
    ) -> Result<bool, OrderError> {
        let pending = self.begin_checkout(form)?;
        let outcome = send_order(transport, endpoint, pending.order_id, pending.fields).await;
        let failure = outcome.clone().err();
        let reset = self.finish_checkout(pending.order_id, outcome);
        match failure {
            Some(err) => Err(err),
            None => Ok(reset),
        }
    }

    /// Clear the one-time banner once the shell has shown it.
    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    pub fn render(&self) -> PageRegions {
        render::render_page(
            &self.menu,
            &self.cart,
            &self.reviews,
            &self.currency,
            &self.order_status,
            self.banner.as_deref(),
        )
    }
}

/// Read and delete the last-order flag so the banner shows exactly once.
fn take_last_order_flag(db: &DbState) -> Option<String> {
    let value = match read_local_json(db, LAST_ORDER_KEY) {
        Ok(Value::Null) => return None,
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "failed to read last-order flag");
            return None;
        }
    };
    if let Err(e) = delete_local_json(db, LAST_ORDER_KEY) {
        warn!(error = %e, "failed to clear last-order flag");
    }
    let placed_at = value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));
    Some(confirmation_banner(placed_at))
}
