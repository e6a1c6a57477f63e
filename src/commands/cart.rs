use serde_json::Value;

use super::payload_string;
use crate::storefront::Storefront;

const ITEM_ID_KEYS: &[&str] = &["itemId", "item_id", "id"];

pub fn cart_add(sf: &mut Storefront, payload: Value) -> Result<Value, String> {
    let item_id = payload_string(&payload, ITEM_ID_KEYS).ok_or("Missing itemId")?;
    // Buttons only exist for menu items; anything else is a stale or forged id.
    if !sf.menu().contains(&item_id) {
        return Err(format!("Unknown menu item: {item_id}"));
    }
    sf.add_to_cart(&item_id)?;
    Ok(serde_json::json!({
        "itemId": item_id,
        "quantity": sf.cart().quantity(&item_id),
    }))
}

pub fn cart_remove(sf: &mut Storefront, payload: Value) -> Result<Value, String> {
    let item_id = payload_string(&payload, ITEM_ID_KEYS).ok_or("Missing itemId")?;
    let changed = sf.remove_from_cart(&item_id)?;
    Ok(serde_json::json!({
        "itemId": item_id,
        "changed": changed,
        "quantity": sf.cart().quantity(&item_id),
    }))
}
