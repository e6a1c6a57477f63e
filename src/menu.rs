//! Menu loader for the storefront.
//!
//! The menu is a static, ordered list of items. It comes from a compiled-in
//! literal by default, or from a JSON document on disk or behind a URL. Once
//! loaded it is never mutated; a reload replaces it wholesale.

use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Timeout for fetching a remote menu document.
const MENU_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default, alias = "imageUrl", alias = "image_url")]
    pub image: Option<String>,
}

/// Where the menu is loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuSource {
    Inline,
    File(PathBuf),
    Url(String),
}

impl MenuSource {
    /// Parse `inline`, `file:<path>` or an `http(s)://` URL. Anything else
    /// falls back to the inline menu.
    pub fn from_value(value: Option<&str>) -> Self {
        let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Self::Inline;
        };
        if let Some(path) = raw.strip_prefix("file:") {
            return Self::File(PathBuf::from(path.trim()));
        }
        let lower = raw.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Self::Url(raw.to_string());
        }
        if !lower.eq_ignore_ascii_case("inline") {
            warn!(source = %raw, "unrecognised menu source, using inline menu");
        }
        Self::Inline
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Inline => "inline".to_string(),
            Self::File(path) => format!("file:{}", path.display()),
            Self::Url(url) => url.clone(),
        }
    }
}

/// The loaded menu, in display order.
#[derive(Debug, Clone, Default)]
pub struct Menu {
    items: Vec<MenuItem>,
}

impl Menu {
    pub fn new(items: Vec<MenuItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&MenuItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// The compiled-in menu.
pub fn inline_menu() -> Menu {
    let item = |id: &str, name: &str, description: &str, price: f64, image: Option<&str>| {
        MenuItem {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            price,
            image: image.map(str::to_string),
        }
    };
    Menu::new(vec![
        item(
            "sourdough",
            "Country Sourdough",
            "Naturally leavened loaf with a crackling crust and open crumb.",
            7.0,
            Some("images/sourdough.jpg"),
        ),
        item(
            "baguette",
            "Classic Baguette",
            "Long-fermented French baguette, baked every morning.",
            3.5,
            Some("images/baguette.jpg"),
        ),
        item(
            "croissant",
            "Butter Croissant",
            "Laminated with cultured butter, flaky and golden.",
            4.0,
            Some("images/croissant.jpg"),
        ),
        item(
            "pain-au-chocolat",
            "Pain au Chocolat",
            "Croissant dough wrapped around two bars of dark chocolate.",
            4.5,
            None,
        ),
        item(
            "cinnamon-roll",
            "Cinnamon Roll",
            "Soft brioche swirl with cinnamon sugar and cream cheese glaze.",
            5.0,
            Some("images/cinnamon-roll.jpg"),
        ),
        item(
            "focaccia",
            "Rosemary Focaccia",
            "Olive oil focaccia with rosemary and flaky sea salt.",
            6.25,
            None,
        ),
    ])
}

/// Parse a menu document: a JSON array of item records.
///
/// Items with a missing id, a duplicate id, or a negative/non-finite price
/// are skipped with a warning so one bad record does not hide the menu.
pub fn parse_menu(raw: &str) -> Result<Menu, String> {
    let parsed: Value =
        serde_json::from_str(raw).map_err(|e| format!("Menu document is not valid JSON: {e}"))?;
    let entries = parsed
        .as_array()
        .ok_or("Menu document must be a JSON array of items")?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut items = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let mut item: MenuItem = match serde_json::from_value(entry.clone()) {
            Ok(item) => item,
            Err(e) => {
                warn!(index, error = %e, "skipping malformed menu item");
                continue;
            }
        };
        item.id = item.id.trim().to_string();
        if item.id.is_empty() {
            warn!(index, "skipping menu item without id");
            continue;
        }
        if !item.price.is_finite() || item.price < 0.0 {
            warn!(index, id = %item.id, price = item.price, "skipping menu item with invalid price");
            continue;
        }
        if !seen.insert(item.id.clone()) {
            warn!(index, id = %item.id, "skipping duplicate menu item id");
            continue;
        }
        item.image = item
            .image
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        items.push(item);
    }

    Ok(Menu::new(items))
}

/// Load the menu from its configured source.
pub async fn load_menu(source: &MenuSource) -> Result<Menu, String> {
    let menu = match source {
        MenuSource::Inline => inline_menu(),
        MenuSource::File(path) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| format!("read menu file {}: {e}", path.display()))?;
            parse_menu(&raw)?
        }
        MenuSource::Url(url) => fetch_menu(url).await?,
    };
    info!(source = %source.describe(), items = menu.len(), "menu loaded");
    Ok(menu)
}

async fn fetch_menu(url: &str) -> Result<Menu, String> {
    let client = Client::builder()
        .timeout(MENU_FETCH_TIMEOUT)
        .build()
        .map_err(|e| format!("Failed to create HTTP client: {e}"))?;

    debug!(url = %url, "fetching menu document");
    let resp = client
        .get(url)
        .header(CACHE_CONTROL, "no-cache")
        .header(PRAGMA, "no-cache")
        .send()
        .await
        .map_err(|e| format!("Network error fetching menu from {url}: {e}"))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(format!(
            "Menu document request failed (HTTP {})",
            status.as_u16()
        ));
    }

    let body = resp
        .text()
        .await
        .map_err(|e| format!("read menu body: {e}"))?;
    parse_menu(&body)
}
