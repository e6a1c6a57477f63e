//! Page region renderer.
//!
//! Every function here is pure: given the menu, cart and reviews it rebuilds
//! a region's markup from scratch. There is no diffing; the shell replaces
//! each region's contents wholesale.

use chrono::{Datelike, Utc};
use serde::Serialize;

use crate::cart::Cart;
use crate::menu::Menu;
use crate::reviews::{ReviewStore, MAX_RATING};

pub const EMPTY_CART_MESSAGE: &str = "Your cart is empty.";
pub const EMPTY_REVIEWS_MESSAGE: &str = "No reviews yet. Be the first to share your thoughts!";

/// The page regions, keyed by the element id the shell replaces.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct PageRegions {
    #[serde(rename = "menu-grid")]
    pub menu_grid: String,
    #[serde(rename = "cart-items")]
    pub cart_items: String,
    #[serde(rename = "cart-total")]
    pub cart_total: String,
    #[serde(rename = "order-status")]
    pub order_status: String,
    #[serde(rename = "review-list")]
    pub review_list: String,
    pub year: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
}

fn esc(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Format a money value with exactly two decimals and the currency prefix.
pub fn money(value: f64, currency: &str) -> String {
    format!("{currency}{value:.2}")
}

/// Sum of price x quantity over cart lines that resolve against the menu.
pub fn cart_total(menu: &Menu, cart: &Cart) -> f64 {
    cart.lines()
        .filter_map(|(id, qty)| menu.get(id).map(|item| item.price * f64::from(qty)))
        .fold(0.0, |acc, line| acc + line)
}

/// "Name xQty, ..." for every resolvable cart line.
pub fn order_summary(menu: &Menu, cart: &Cart) -> String {
    cart.lines()
        .filter_map(|(id, qty)| menu.get(id).map(|item| format!("{} x{qty}", item.name)))
        .collect::<Vec<String>>()
        .join(", ")
}

pub fn render_menu(menu: &Menu, currency: &str) -> String {
    let mut out = String::new();
    for item in menu.items() {
        out.push_str(&format!(
            "<article class=\"menu-item\" data-id=\"{}\">",
            esc(&item.id)
        ));
        if let Some(image) = item.image.as_deref() {
            out.push_str(&format!(
                "<img class=\"menu-item__image\" src=\"{}\" alt=\"{}\" loading=\"lazy\"/>",
                esc(image),
                esc(&item.name)
            ));
        }
        out.push_str(&format!(
            "<h3 class=\"menu-item__name\">{}</h3><p class=\"menu-item__description\">{}</p>\
             <div class=\"menu-item__footer\"><span class=\"menu-item__price\">{}</span>\
             <button type=\"button\" data-action=\"cart_add\" data-id=\"{}\">Add to cart</button></div>\
             </article>",
            esc(&item.name),
            esc(&item.description),
            money(item.price, currency),
            esc(&item.id)
        ));
    }
    out
}

/// Cart region markup and the formatted total.
pub fn render_cart(menu: &Menu, cart: &Cart, currency: &str) -> (String, String) {
    let total = money(cart_total(menu, cart), currency);
    let lines: Vec<String> = cart
        .lines()
        .filter_map(|(id, qty)| {
            let item = menu.get(id)?;
            Some(format!(
                "<li class=\"cart-line\" data-id=\"{id}\">\
                 <span class=\"cart-line__name\">{name}</span>\
                 <span class=\"cart-line__qty\">x{qty}</span>\
                 <span class=\"cart-line__price\">{price}</span>\
                 <button type=\"button\" data-action=\"cart_remove\" data-id=\"{id}\" aria-label=\"Remove one {name}\">-</button>\
                 <button type=\"button\" data-action=\"cart_add\" data-id=\"{id}\" aria-label=\"Add one {name}\">+</button>\
                 </li>",
                id = esc(id),
                name = esc(&item.name),
                price = money(item.price * f64::from(qty), currency),
            ))
        })
        .collect();

    if lines.is_empty() {
        return (format!("<p class=\"empty\">{EMPTY_CART_MESSAGE}</p>"), total);
    }
    (format!("<ul class=\"cart-lines\">{}</ul>", lines.concat()), total)
}

fn stars(rating: u8) -> String {
    let filled = usize::from(rating.min(MAX_RATING));
    let empty = usize::from(MAX_RATING) - filled;
    format!("{}{}", "\u{2605}".repeat(filled), "\u{2606}".repeat(empty))
}

pub fn render_reviews(reviews: &ReviewStore) -> String {
    if reviews.is_empty() {
        return format!("<p class=\"empty\">{EMPTY_REVIEWS_MESSAGE}</p>");
    }
    reviews
        .most_recent_first()
        .into_iter()
        .map(|review| {
            format!(
                "<article class=\"review\"><header><strong>{}</strong>\
                 <span class=\"review__rating\" aria-label=\"{} out of {MAX_RATING}\">{}</span>\
                 <time datetime=\"{}\">{}</time></header><p>{}</p></article>",
                esc(&review.reviewer),
                review.rating,
                stars(review.rating),
                review.created_at.to_rfc3339(),
                review.created_at.format("%Y-%m-%d"),
                esc(&review.message)
            )
        })
        .collect()
}

/// Rebuild every region from current state.
pub fn render_page(
    menu: &Menu,
    cart: &Cart,
    reviews: &ReviewStore,
    currency: &str,
    order_status: &str,
    banner: Option<&str>,
) -> PageRegions {
    let (cart_items, cart_total) = render_cart(menu, cart, currency);
    PageRegions {
        menu_grid: render_menu(menu, currency),
        cart_items,
        cart_total,
        order_status: esc(order_status),
        review_list: render_reviews(reviews),
        year: Utc::now().year().to_string(),
        banner: banner.map(esc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::MenuItem;

    fn item(id: &str, name: &str, price: f64) -> MenuItem {
        MenuItem {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            price,
            image: None,
        }
    }

    fn sample_menu() -> Menu {
        Menu::new(vec![item("a", "a-name", 7.0), item("b", "b-name", 4.0)])
    }

    #[test]
    fn money_has_two_decimals_and_prefix() {
        assert_eq!(money(18.0, "$"), "$18.00");
        assert_eq!(money(3.5, "\u{20ac}"), "\u{20ac}3.50");
        assert_eq!(money(0.126, "$"), "$0.13");
    }

    #[test]
    fn total_and_summary_example() {
        let menu = sample_menu();
        let mut cart = Cart::new();
        cart.add("a");
        cart.add("a");
        cart.add("b");
        assert!((cart_total(&menu, &cart) - 18.0).abs() < f64::EPSILON);
        assert_eq!(money(cart_total(&menu, &cart), "$"), "$18.00");
        assert_eq!(order_summary(&menu, &cart), "a-name x2, b-name x1");
    }

    #[test]
    fn unknown_ids_contribute_nothing() {
        let menu = sample_menu();
        let mut cart = Cart::new();
        cart.add("gone");
        cart.add("b");
        assert!((cart_total(&menu, &cart) - 4.0).abs() < f64::EPSILON);
        assert_eq!(order_summary(&menu, &cart), "b-name x1");
        let (items, total) = render_cart(&menu, &cart, "$");
        assert!(!items.contains("gone"));
        assert_eq!(total, "$4.00");
    }

    #[test]
    fn empty_placeholders() {
        let menu = sample_menu();
        let (items, total) = render_cart(&menu, &Cart::new(), "$");
        assert!(items.contains(EMPTY_CART_MESSAGE));
        assert_eq!(total, "$0.00");
        assert!(render_reviews(&ReviewStore::default()).contains(EMPTY_REVIEWS_MESSAGE));

        // A cart holding only unresolvable ids renders as empty too
        let mut stale = Cart::new();
        stale.add("gone");
        let (items, total) = render_cart(&menu, &stale, "$");
        assert!(items.contains(EMPTY_CART_MESSAGE));
        assert_eq!(total, "$0.00");
        assert!(cart_total(&menu, &stale).is_sign_positive());
    }

    #[test]
    fn escapes_user_text() {
        let mut reviews = ReviewStore::default();
        reviews
            .append("<script>", 4, "Tom & Jerry's \"best\"")
            .unwrap();
        let html = render_reviews(&reviews);
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("Tom &amp; Jerry&#39;s &quot;best&quot;"));
        assert!(html.contains("\u{2605}\u{2605}\u{2605}\u{2605}\u{2606}"));
    }

    #[test]
    fn newest_review_renders_first() {
        let mut reviews = ReviewStore::default();
        reviews.append("Ben", 3, "Fine").unwrap();
        reviews.append("Ana", 5, "Great bread").unwrap();
        let html = render_reviews(&reviews);
        let ana = html.find("Ana").unwrap();
        let ben = html.find("Ben").unwrap();
        assert!(ana < ben);
    }

    #[test]
    fn menu_renders_every_item_in_order() {
        let mut menu_items = vec![item("a", "a-name", 7.0), item("b", "b-name", 4.0)];
        menu_items[0].image = Some("a.jpg".to_string());
        let html = render_menu(&Menu::new(menu_items), "$");
        assert!(html.find("a-name").unwrap() < html.find("b-name").unwrap());
        assert!(html.contains("src=\"a.jpg\""));
        assert!(html.contains("$7.00"));
        assert_eq!(html.matches("<img").count(), 1);
    }

    #[test]
    fn page_regions_serialize_with_element_ids() {
        let page = render_page(
            &sample_menu(),
            &Cart::new(),
            &ReviewStore::default(),
            "$",
            "",
            None,
        );
        let value = serde_json::to_value(&page).unwrap();
        for key in [
            "menu-grid",
            "cart-items",
            "cart-total",
            "order-status",
            "review-list",
            "year",
        ] {
            assert!(value.get(key).is_some(), "missing region {key}");
        }
        assert!(value.get("banner").is_none());
    }
}
