use serde_json::Value;
use tracing::{info, warn};

use crate::menu::{Menu, MenuSource};
use crate::storefront::Storefront;

/// Apply the result of reloading the menu from `source`. The host loads the
/// menu on a background task; on failure the current menu stays in place.
pub fn apply_menu_reload(
    sf: &mut Storefront,
    source: &MenuSource,
    loaded: Result<Menu, String>,
) -> Result<Value, String> {
    let source = source.describe();
    match loaded {
        Ok(fresh) => {
            let count = fresh.len();
            sf.replace_menu(fresh);
            info!(source = %source, items = count, "menu reloaded");
            Ok(serde_json::json!({ "source": source, "items": count }))
        }
        Err(error) => {
            warn!(source = %source, error = %error, "menu reload failed, keeping current menu");
            Err(error)
        }
    }
}
