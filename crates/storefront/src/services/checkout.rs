//! Checkout: turn a signed-in user's cart into pending orders and a hosted
//! payment page.
//!
//! 1. Validate the cart (non-empty, every product active with enough stock,
//!    a single currency).
//! 2. Create one `PENDING` order per vendor in one transaction.
//! 3. Ask the payment gateway for a checkout session.
//! 4. Store the session on the orders and clear the cart, atomically.
//!
//! If the gateway fails, the new orders are cancelled and the cart is left
//! as it was so the customer can try again.

use std::collections::{BTreeMap, HashMap};

use sqlx::SqlitePool;
use thiserror::Error;

use handicrafts_core::{CurrencyCode, Money, MoneyError, OrderId, ProductId, VendorId};

use crate::config::StorefrontConfig;
use crate::db::orders::NewOrder;
use crate::db::{CartRepository, OrderRepository, ProductRepository, RepositoryError};
use crate::models::order::MissingField;
use crate::models::{CartLine, CurrentUser, OrderItem, Product, ShippingAddress};
use crate::payments::{
    CheckoutLineItem, CheckoutRequest, CheckoutSession, PaymentError, PaymentGateway,
};

/// Errors from checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Nothing to buy.
    #[error("cart is empty")]
    EmptyCart,

    /// A required address field is blank.
    #[error(transparent)]
    InvalidAddress(#[from] MissingField),

    /// A product is inactive, deleted or short on stock.
    #[error("{0} is no longer available in the requested quantity")]
    Unavailable(String),

    /// The cart mixes currencies.
    #[error("all items in a checkout must use the same currency")]
    MixedCurrencies,

    /// No payment gateway is configured.
    #[error("payments are not configured")]
    PaymentsDisabled,

    /// The payment gateway failed.
    #[error("payment provider error: {0}")]
    Gateway(#[from] PaymentError),

    /// Totals overflowed.
    #[error("money error: {0}")]
    Money(#[from] MoneyError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Checkout service.
pub struct CheckoutService<'a> {
    pool: &'a SqlitePool,
    config: &'a StorefrontConfig,
    gateway: Option<&'a dyn PaymentGateway>,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(
        pool: &'a SqlitePool,
        config: &'a StorefrontConfig,
        gateway: Option<&'a dyn PaymentGateway>,
    ) -> Self {
        Self {
            pool,
            config,
            gateway,
        }
    }

    /// Run checkout for `user` and return the payment page to redirect to.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError` describing why checkout could not start. On
    /// `CheckoutError::Gateway` the orders created for this attempt have
    /// been cancelled and the cart is unchanged.
    #[tracing::instrument(skip(self, user, address), fields(user_id = %user.id))]
    pub async fn start(
        &self,
        user: &CurrentUser,
        address: ShippingAddress,
    ) -> Result<CheckoutSession, CheckoutError> {
        let lines = CartRepository::new(self.pool).list(user.id).await?;
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let gateway = self.gateway.ok_or(CheckoutError::PaymentsDisabled)?;
        let address = address.normalized()?;

        let ids: Vec<ProductId> = lines.iter().map(|l| l.product_id).collect();
        let products: HashMap<ProductId, Product> = ProductRepository::new(self.pool)
            .get_many(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let (currency, new_orders) = build_orders(&lines, &products)?;

        let orders_repo = OrderRepository::new(self.pool);
        let orders = orders_repo
            .create_pending(user.id, &new_orders, &address)
            .await?;
        let order_ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        tracing::info!(orders = ?order_ids, "Created pending orders");

        let request = CheckoutRequest {
            currency,
            line_items: orders
                .iter()
                .flat_map(|o| &o.items)
                .map(|item| CheckoutLineItem {
                    name: item.title.clone(),
                    unit_amount_minor: item.unit_price_minor,
                    quantity: item.quantity,
                })
                .collect(),
            success_url: self
                .config
                .absolute_url("/checkout/success?session_id={CHECKOUT_SESSION_ID}"),
            cancel_url: self.config.absolute_url("/checkout/cancel"),
            customer_email: Some(user.email.to_string()),
            order_ids: order_ids.clone(),
        };

        let session = match gateway.create_checkout_session(&request).await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(error = %e, "Payment gateway failed, cancelling orders");
                if let Err(cancel_err) = orders_repo.cancel_pending(&order_ids).await {
                    tracing::error!(error = %cancel_err, "Failed to cancel orders after gateway error");
                }
                return Err(CheckoutError::Gateway(e));
            }
        };

        orders_repo
            .attach_checkout_session(user.id, &order_ids, &session.id)
            .await?;

        Ok(session)
    }
}

/// Validate lines and group them into one order per vendor.
fn build_orders(
    lines: &[CartLine],
    products: &HashMap<ProductId, Product>,
) -> Result<(CurrencyCode, Vec<NewOrder>), CheckoutError> {
    let mut currency: Option<CurrencyCode> = None;
    let mut by_vendor: BTreeMap<VendorId, (Vec<OrderItem>, Option<Money>)> = BTreeMap::new();

    for line in lines {
        let product = products
            .get(&line.product_id)
            .ok_or_else(|| CheckoutError::Unavailable(format!("Product {}", line.product_id)))?;
        if !product.can_fulfil(line.quantity) {
            return Err(CheckoutError::Unavailable(
                product.title.default_text().to_string(),
            ));
        }

        match currency {
            Some(c) if c != product.price.currency => return Err(CheckoutError::MixedCurrencies),
            _ => currency = Some(product.price.currency),
        }

        let line_total = product.price.checked_mul(line.quantity)?;
        let (items, total) = by_vendor.entry(product.vendor_id).or_default();
        items.push(OrderItem {
            product_id: product.id,
            title: product.title.default_text().to_string(),
            quantity: line.quantity,
            unit_price_minor: product.price.amount_minor,
        });
        *total = Some(match total.take() {
            Some(sum) => sum.checked_add(line_total)?,
            None => line_total,
        });
    }

    let currency = currency.ok_or(CheckoutError::EmptyCart)?;
    let orders = by_vendor
        .into_iter()
        .map(|(vendor_id, (items, total))| NewOrder {
            vendor_id,
            items,
            total: total.unwrap_or(Money::zero(currency)),
        })
        .collect();
    Ok((currency, orders))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use handicrafts_core::OrderStatus;
    use secrecy::SecretString;

    use super::*;
    use crate::db::test_support::{address, approved_vendor, pool, product, user};

    struct FakeGateway {
        fail: bool,
        requests: Mutex<Vec<CheckoutRequest>>,
    }

    impl FakeGateway {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PaymentGateway for FakeGateway {
        async fn create_checkout_session(
            &self,
            request: &CheckoutRequest,
        ) -> Result<CheckoutSession, PaymentError> {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(PaymentError::Provider {
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            Ok(CheckoutSession {
                id: "cs_test_123".to_string(),
                url: "https://pay.example/cs_test_123".to_string(),
            })
        }
    }

    fn config() -> StorefrontConfig {
        StorefrontConfig::with_defaults(SecretString::from("k".repeat(32)))
    }

    #[tokio::test]
    async fn test_checkout_creates_one_order_per_vendor_and_clears_cart() {
        let pool = pool().await;
        let buyer = user(&pool, "buyer@example.com").await;
        let potter = approved_vendor(&pool, "potter@example.com").await;
        let weaver = approved_vendor(&pool, "weaver@example.com").await;
        let vase = product(&pool, potter.id, "Terracotta Vase", 59_900, 5).await;
        let basket = product(&pool, weaver.id, "Bamboo Basket", 29_900, 5).await;

        let carts = CartRepository::new(&pool);
        carts.add(buyer.id, vase.id, 2).await.unwrap();
        carts.add(buyer.id, basket.id, 1).await.unwrap();

        let gateway = FakeGateway::new(false);
        let config = config();
        let checkout = CheckoutService::new(&pool, &config, Some(&gateway));
        let session = checkout
            .start(&CurrentUser::from(&buyer), address())
            .await
            .unwrap();
        assert_eq!(session.url, "https://pay.example/cs_test_123");

        let orders = OrderRepository::new(&pool).list_by_user(buyer.id).await.unwrap();
        assert_eq!(orders.len(), 2);
        assert!(orders.iter().all(|o| o.status == OrderStatus::Pending));
        assert!(
            orders
                .iter()
                .all(|o| o.checkout_session_id.as_deref() == Some("cs_test_123"))
        );
        let vase_order = orders.iter().find(|o| o.vendor_id == potter.id).unwrap();
        assert_eq!(vase_order.total.amount_minor, 119_800);

        assert!(carts.list(buyer.id).await.unwrap().is_empty());

        let requests = gateway.requests.lock().unwrap();
        assert_eq!(requests[0].line_items.len(), 2);
        assert_eq!(requests[0].order_ids.len(), 2);
        assert!(requests[0].success_url.starts_with("http://127.0.0.1:3000/checkout/success"));
    }

    #[tokio::test]
    async fn test_gateway_failure_cancels_orders_and_keeps_cart() {
        let pool = pool().await;
        let buyer = user(&pool, "buyer@example.com").await;
        let vendor = approved_vendor(&pool, "potter@example.com").await;
        let vase = product(&pool, vendor.id, "Terracotta Vase", 59_900, 5).await;
        CartRepository::new(&pool).add(buyer.id, vase.id, 1).await.unwrap();

        let gateway = FakeGateway::new(true);
        let config = config();
        let err = CheckoutService::new(&pool, &config, Some(&gateway))
            .start(&CurrentUser::from(&buyer), address())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Gateway(_)));

        let orders = OrderRepository::new(&pool).list_by_user(buyer.id).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, OrderStatus::Cancelled);
        assert_eq!(CartRepository::new(&pool).list(buyer.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_empty_cart_short_stock_and_missing_gateway() {
        let pool = pool().await;
        let buyer = user(&pool, "buyer@example.com").await;
        let vendor = approved_vendor(&pool, "potter@example.com").await;
        let vase = product(&pool, vendor.id, "Terracotta Vase", 59_900, 1).await;
        let gateway = FakeGateway::new(false);
        let config = config();
        let current = CurrentUser::from(&buyer);
        let checkout = CheckoutService::new(&pool, &config, Some(&gateway));

        assert!(matches!(
            checkout.start(&current, address()).await,
            Err(CheckoutError::EmptyCart)
        ));

        CartRepository::new(&pool).add(buyer.id, vase.id, 3).await.unwrap();
        assert!(matches!(
            checkout.start(&current, address()).await,
            Err(CheckoutError::Unavailable(_))
        ));

        assert!(matches!(
            CheckoutService::new(&pool, &config, None)
                .start(&current, address())
                .await,
            Err(CheckoutError::PaymentsDisabled)
        ));
        assert!(gateway.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_mixed_currencies_rejected() {
        use chrono::Utc;
        use handicrafts_core::LocalizedText;

        let make = |id: i64, currency| Product {
            id: ProductId::new(id),
            vendor_id: VendorId::new(1),
            title: LocalizedText::new(format!("Item {id}")),
            description: LocalizedText::default(),
            category: "Misc".to_string(),
            price: Money::new(1_000, currency),
            stock: 10,
            images: Vec::new(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let products: HashMap<ProductId, Product> = [
            (ProductId::new(1), make(1, CurrencyCode::Inr)),
            (ProductId::new(2), make(2, CurrencyCode::Usd)),
        ]
        .into_iter()
        .collect();
        let lines = [
            CartLine {
                product_id: ProductId::new(1),
                quantity: 1,
            },
            CartLine {
                product_id: ProductId::new(2),
                quantity: 1,
            },
        ];

        assert!(matches!(
            build_orders(&lines, &products),
            Err(CheckoutError::MixedCurrencies)
        ));
    }
}
