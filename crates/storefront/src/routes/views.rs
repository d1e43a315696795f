//! Display types shared by the page templates.
//!
//! Templates only see pre-formatted strings; prices, dates and statuses are
//! rendered here so the HTML stays free of formatting logic.

use handicrafts_core::DEFAULT_LOCALE;

use crate::models::{CurrentUser, Order, Payout, Product, Vendor};
use crate::services::cart::{CartEntry, CartSummary};

/// Date format used on every page.
const DATE_FORMAT: &str = "%d %b %Y";

/// Navigation state for the layout.
#[derive(Clone, Default)]
pub struct Nav {
    pub user_name: Option<String>,
    pub is_admin: bool,
}

impl Nav {
    #[must_use]
    pub fn new(user: Option<&CurrentUser>) -> Self {
        Self {
            user_name: user.map(|u| u.name.clone()),
            is_admin: user.is_some_and(|u| u.is_admin),
        }
    }

    #[must_use]
    pub const fn signed_in(&self) -> bool {
        self.user_name.is_some()
    }
}

/// Product card / detail data.
#[derive(Clone)]
pub struct ProductView {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub price: String,
    pub stock: i64,
    pub image: Option<String>,
    pub images: Vec<String>,
    pub in_stock: bool,
    pub is_active: bool,
}

impl ProductView {
    #[must_use]
    pub fn new(product: &Product, locale: &str) -> Self {
        Self {
            id: product.id.as_i64(),
            url: product.url(),
            title: product.title.get(locale).to_string(),
            description: product.description.get(locale).to_string(),
            category: product.category.clone(),
            price: product.price.display(),
            stock: product.stock,
            image: product.primary_image().map(String::from),
            images: product.images.clone(),
            in_stock: product.is_active && product.stock > 0,
            is_active: product.is_active,
        }
    }

    #[must_use]
    pub fn list(products: &[Product], locale: &str) -> Vec<Self> {
        products.iter().map(|p| Self::new(p, locale)).collect()
    }
}

/// One row of the cart page.
#[derive(Clone)]
pub struct CartLineView {
    pub product: ProductView,
    pub quantity: u32,
    pub line_total: String,
    pub available: bool,
}

impl From<&CartEntry> for CartLineView {
    fn from(entry: &CartEntry) -> Self {
        Self {
            product: ProductView::new(&entry.product, DEFAULT_LOCALE),
            quantity: entry.quantity,
            line_total: entry.line_total.display(),
            available: entry.is_available(),
        }
    }
}

/// Priced cart for the cart and checkout pages.
#[derive(Clone, Default)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub total: Option<String>,
    pub item_count: u32,
    pub mixed_currencies: bool,
    pub all_available: bool,
}

impl CartView {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl From<&CartSummary> for CartView {
    fn from(summary: &CartSummary) -> Self {
        let lines: Vec<CartLineView> = summary.entries.iter().map(CartLineView::from).collect();
        Self {
            all_available: lines.iter().all(|l| l.available),
            total: summary.total.map(|t| t.display()),
            item_count: summary.item_count,
            mixed_currencies: summary.has_mixed_currencies(),
            lines,
        }
    }
}

#[derive(Clone)]
pub struct OrderItemView {
    pub title: String,
    pub quantity: u32,
    pub line_total: String,
}

#[derive(Clone)]
pub struct OrderView {
    pub id: i64,
    pub vendor_id: i64,
    pub status: String,
    pub status_label: &'static str,
    pub total: String,
    pub items: Vec<OrderItemView>,
    pub ship_to: String,
    pub recipient: String,
    pub placed_on: String,
    pub can_ship: bool,
    pub can_cancel: bool,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        use handicrafts_core::OrderStatus;

        Self {
            id: order.id.as_i64(),
            vendor_id: order.vendor_id.as_i64(),
            status: order.status.to_string(),
            status_label: order.status.label(),
            total: order.total.display(),
            items: order
                .items
                .iter()
                .map(|item| OrderItemView {
                    title: item.title.clone(),
                    quantity: item.quantity,
                    line_total: item.line_total(order.total.currency).display(),
                })
                .collect(),
            ship_to: order.shipping_address.one_line(),
            recipient: order.shipping_address.full_name.clone(),
            placed_on: order.created_at.format(DATE_FORMAT).to_string(),
            can_ship: order.status.can_transition_to(OrderStatus::Shipped),
            can_cancel: order.status.can_transition_to(OrderStatus::Cancelled),
        }
    }
}

#[derive(Clone)]
pub struct PayoutView {
    pub id: i64,
    pub vendor_id: i64,
    pub order_id: i64,
    pub amount: String,
    pub status_label: &'static str,
    pub is_pending: bool,
    pub created_on: String,
}

impl From<&Payout> for PayoutView {
    fn from(payout: &Payout) -> Self {
        Self {
            id: payout.id.as_i64(),
            vendor_id: payout.vendor_id.as_i64(),
            order_id: payout.order_id.as_i64(),
            amount: payout.amount.display(),
            status_label: payout.status.label(),
            is_pending: payout.status == handicrafts_core::PayoutStatus::Pending,
            created_on: payout.created_at.format(DATE_FORMAT).to_string(),
        }
    }
}

#[derive(Clone)]
pub struct VendorView {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub status: String,
    pub status_label: &'static str,
    pub payout_info: String,
    pub can_approve: bool,
    pub can_reject: bool,
    pub can_sell: bool,
}

impl From<&Vendor> for VendorView {
    fn from(vendor: &Vendor) -> Self {
        use handicrafts_core::VendorStatus;

        Self {
            id: vendor.id.as_i64(),
            name: vendor.name.clone(),
            description: vendor.description.clone(),
            status: vendor.status.to_string(),
            status_label: vendor.status.label(),
            payout_info: vendor.payout_info.clone(),
            can_approve: vendor.status.can_transition_to(VendorStatus::Approved),
            can_reject: vendor.status.can_transition_to(VendorStatus::Rejected),
            can_sell: vendor.status.can_sell(),
        }
    }
}

/// User-facing text for an `?error=` code.
#[must_use]
pub fn error_message(code: &str) -> String {
    match code {
        "invalid_credentials" => "Invalid email or password.",
        "invalid_email" => "Please enter a valid email address.",
        "email_taken" => "An account with this email already exists.",
        "weak_password" => "Password must be at least 8 characters.",
        "password_mismatch" => "Passwords do not match.",
        "missing_name" => "Please enter your name.",
        "current_password" => "Your current password is required to set a new one.",
        "wrong_password" => "Your current password is incorrect.",
        "already_applied" => "You have already applied to sell.",
        "unavailable" => "That product is not available right now.",
        "session" => "Your session could not be saved. Please try again.",
        _ => "Something went wrong. Please try again.",
    }
    .to_string()
}

/// User-facing text for a `?success=` code.
#[must_use]
pub fn success_message(code: &str) -> String {
    match code {
        "profile_updated" => "Your profile has been updated.",
        "applied" => "Application received. An administrator will review it shortly.",
        "product_saved" => "Product saved.",
        _ => "Done.",
    }
    .to_string()
}
