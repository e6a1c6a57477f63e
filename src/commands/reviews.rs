use serde::Deserialize;
use serde_json::Value;

use crate::storefront::Storefront;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewSubmitPayload {
    #[serde(default, alias = "name", alias = "reviewer_name")]
    reviewer: String,
    #[serde(default)]
    rating: Value,
    #[serde(default, alias = "comment", alias = "review")]
    message: String,
}

/// Ratings arrive from a `<select>` as strings or from script as numbers.
/// Anything unparseable becomes 0, which the store rejects.
fn rating_from_value(value: &Value) -> i64 {
    if let Some(n) = value.as_i64() {
        return n;
    }
    value
        .as_str()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(0)
}

/// Submit a review. Invalid reviews are dropped without an error: the reply
/// is still successful, with `accepted: false` and the reason.
pub fn review_submit(sf: &mut Storefront, payload: Value) -> Result<Value, String> {
    let parsed: ReviewSubmitPayload = serde_json::from_value(payload)
        .map_err(|e| format!("Invalid review payload: {e}"))?;
    let rating = rating_from_value(&parsed.rating);
    match sf.submit_review(&parsed.reviewer, rating, &parsed.message)? {
        Ok(()) => Ok(serde_json::json!({
            "accepted": true,
            "resetForm": true,
            "reviewCount": sf.reviews().len(),
        })),
        Err(rejection) => Ok(serde_json::json!({
            "accepted": false,
            "reason": rejection.as_str(),
        })),
    }
}
