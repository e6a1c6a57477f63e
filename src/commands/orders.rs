use serde_json::Value;

use super::CommandOutcome;
use crate::order::CheckoutForm;
use crate::storefront::Storefront;

/// Start a checkout. Guard failures (empty cart, order already in flight)
/// reply straight away with the status message; otherwise the host sends the
/// order and reports the outcome as an `order_result` event.
pub fn order_submit(sf: &mut Storefront, payload: Value) -> CommandOutcome {
    let form = CheckoutForm::from_payload(&payload);
    match sf.begin_checkout(form) {
        Ok(pending) => {
            let reply = serde_json::json!({
                "orderId": pending.order_id.to_string(),
                "status": sf.order_status(),
            });
            CommandOutcome::Submit { pending, reply }
        }
        Err(err) => CommandOutcome::Reply(Err(err.user_message())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::test_storefront;
    use crate::order::{SubmissionState, EMPTY_CART_STATUS, IN_FLIGHT_STATUS, SUBMITTING_STATUS};

    fn checkout_payload() -> Value {
        serde_json::json!({"name": "Ana", "phone": "555-0100", "notes": "", "email": "ana@example.com"})
    }

    #[test]
    fn empty_cart_replies_with_status() {
        let mut sf = test_storefront();
        match order_submit(&mut sf, checkout_payload()) {
            CommandOutcome::Reply(Err(message)) => assert_eq!(message, EMPTY_CART_STATUS),
            _ => panic!("expected empty-cart reply"),
        }
        assert_eq!(sf.order_status(), EMPTY_CART_STATUS);
    }

    #[test]
    fn guarded_submit_returns_pending_order() {
        let mut sf = test_storefront();
        sf.add_to_cart("a").unwrap();
        let CommandOutcome::Submit { pending, reply } = order_submit(&mut sf, checkout_payload())
        else {
            panic!("expected submit");
        };
        assert_eq!(reply["status"], SUBMITTING_STATUS);
        assert_eq!(reply["orderId"], pending.order_id.to_string());
        assert!(pending
            .fields
            .contains(&("email".to_string(), "ana@example.com".to_string())));
        assert_eq!(sf.submission_state(), SubmissionState::Submitting);

        match order_submit(&mut sf, checkout_payload()) {
            CommandOutcome::Reply(Err(message)) => assert_eq!(message, IN_FLIGHT_STATUS),
            _ => panic!("expected in-flight refusal"),
        }
    }
}
