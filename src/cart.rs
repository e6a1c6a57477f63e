//! Cart store: item id -> quantity, persisted under the `cart` key.

use serde_json::Value;
use tracing::{debug, warn};

use crate::db::DbState;
use crate::{read_local_json_object, write_local_json};

pub(crate) const CART_KEY: &str = "cart";

/// Quantities keyed by menu item id, in the order items were first added.
///
/// Every present entry has a quantity of at least one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<(String, u32)>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the quantity for `item_id`, creating the entry if absent.
    pub fn add(&mut self, item_id: &str) {
        match self.lines.iter_mut().find(|(id, _)| id == item_id) {
            Some((_, qty)) => *qty = qty.saturating_add(1),
            None => self.lines.push((item_id.to_string(), 1)),
        }
    }

    /// Decrement the quantity for `item_id`, deleting the entry at zero.
    /// Returns `false` (and changes nothing) when the item is absent.
    pub fn remove(&mut self, item_id: &str) -> bool {
        let Some(pos) = self.lines.iter().position(|(id, _)| id == item_id) else {
            return false;
        };
        let qty = &mut self.lines[pos].1;
        if *qty <= 1 {
            self.lines.remove(pos);
        } else {
            *qty -= 1;
        }
        true
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn quantity(&self, item_id: &str) -> u32 {
        self.lines
            .iter()
            .find(|(id, _)| id == item_id)
            .map(|(_, qty)| *qty)
            .unwrap_or(0)
    }

    pub fn lines(&self) -> impl Iterator<Item = (&str, u32)> {
        self.lines.iter().map(|(id, qty)| (id.as_str(), *qty))
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn to_json(&self) -> Value {
        let map: serde_json::Map<String, Value> = self
            .lines
            .iter()
            .map(|(id, qty)| (id.clone(), Value::from(*qty)))
            .collect();
        Value::Object(map)
    }

    /// Build a cart from its persisted object form. Entries whose value is not
    /// a positive integer are dropped.
    pub fn from_json_object(obj: &serde_json::Map<String, Value>) -> Self {
        let mut lines = Vec::with_capacity(obj.len());
        for (id, value) in obj {
            match value.as_u64().filter(|qty| *qty > 0) {
                Some(qty) => lines.push((id.clone(), u32::try_from(qty).unwrap_or(u32::MAX))),
                None => warn!(item_id = %id, value = %value, "dropping invalid cart entry"),
            }
        }
        Self { lines }
    }
}

/// Restore the cart from local storage; absent or malformed data yields an
/// empty cart.
pub fn load_cart(db: &DbState) -> Cart {
    match read_local_json_object(db, CART_KEY) {
        Ok(obj) => Cart::from_json_object(&obj),
        Err(e) => {
            warn!(error = %e, "cart restore failed, starting empty");
            Cart::new()
        }
    }
}

pub fn save_cart(db: &DbState, cart: &Cart) -> Result<(), String> {
    write_local_json(db, CART_KEY, &cart.to_json())?;
    debug!(lines = cart.len(), "cart persisted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn assert_all_positive(cart: &Cart) {
        assert!(cart.lines().all(|(_, qty)| qty >= 1));
    }

    #[test]
    fn add_creates_then_increments() {
        let mut cart = Cart::new();
        cart.add("a");
        cart.add("b");
        cart.add("a");
        assert_eq!(cart.quantity("a"), 2);
        assert_eq!(cart.quantity("b"), 1);
        let order: Vec<&str> = cart.lines().map(|(id, _)| id).collect();
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn remove_decrements_and_deletes_at_zero() {
        let mut cart = Cart::new();
        cart.add("a");
        cart.add("a");
        assert!(cart.remove("a"));
        assert_eq!(cart.quantity("a"), 1);
        assert!(cart.remove("a"));
        assert_eq!(cart.quantity("a"), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut cart = Cart::new();
        cart.add("a");
        let before = cart.clone();
        assert!(!cart.remove("zzz"));
        assert_eq!(cart, before);
    }

    #[test]
    fn mixed_sequence_keeps_quantities_positive() {
        let mut cart = Cart::new();
        let ops = [
            ("add", "a"),
            ("remove", "a"),
            ("remove", "a"),
            ("add", "b"),
            ("add", "b"),
            ("remove", "c"),
            ("add", "a"),
            ("remove", "b"),
            ("remove", "b"),
            ("remove", "b"),
        ];
        for (op, id) in ops {
            if op == "add" {
                cart.add(id);
            } else {
                cart.remove(id);
            }
            assert_all_positive(&cart);
        }
        assert_eq!(cart.quantity("a"), 1);
        assert_eq!(cart.quantity("b"), 0);
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn restore_drops_invalid_entries() {
        let obj = serde_json::json!({"a": 2, "b": 0, "c": -1, "d": "3", "e": 1.5, "f": 1});
        let cart = Cart::from_json_object(obj.as_object().unwrap());
        let lines: Vec<(&str, u32)> = cart.lines().collect();
        assert_eq!(lines, vec![("a", 2), ("f", 1)]);
    }

    #[test]
    fn persist_round_trip_keeps_order() {
        let db = db::init_in_memory();
        let mut cart = Cart::new();
        cart.add("zeta");
        cart.add("alpha");
        cart.add("zeta");
        save_cart(&db, &cart).unwrap();

        let restored = load_cart(&db);
        assert_eq!(restored, cart);
    }

    #[test]
    fn load_defaults_to_empty() {
        let db = db::init_in_memory();
        assert!(load_cart(&db).is_empty());
        {
            let conn = db.conn.lock().unwrap();
            db::set_setting(&conn, "local", CART_KEY, "[1,2").unwrap();
        }
        assert!(load_cart(&db).is_empty());
    }
}
