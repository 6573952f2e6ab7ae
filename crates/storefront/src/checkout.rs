//! Checkout orchestration: cart validation, order submission, payment
//! hand-off.
//!
//! One [`CheckoutOrchestrator`] drives one checkout attempt through a small
//! state machine:
//!
//! ```text
//! Idle -> Submitting -> Succeeded              (COD)
//! Idle -> Submitting -> AwaitingPayment -> Succeeded | Failed   (CARD)
//! Idle -> Submitting -> Failed                 (validation / API error)
//! ```
//!
//! Validation runs before anything touches the network, and the cart is
//! cleared only once the order is actually paid for or accepted: on COD
//! success, or after the card payment confirms.

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{info, instrument, warn};

use mebius_core::{OrderId, PaymentMethod};

use crate::api::types::{OrderItem, OrderProduct, OrderRequest, ShippingAddress};
use crate::api::{ApiClient, ApiError};
use crate::cart::{CartLine, CartStore};
use crate::storage::{KvStore, keys};

/// Where a checkout attempt currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutState {
    /// No attempt in progress.
    Idle,
    /// Order request is in flight.
    Submitting,
    /// CARD order created; waiting on the payment confirmation.
    AwaitingPayment {
        order_id: OrderId,
        client_secret: String,
    },
    /// Order placed (and, for CARD, paid). Cart has been cleared.
    Succeeded { order_id: OrderId },
    /// Attempt failed; the cart is untouched and can be retried.
    Failed { message: String },
}

/// Checkout failures surfaced to the caller.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("an order is already being submitted")]
    AlreadySubmitting,
    #[error("no payment awaiting confirmation")]
    NotAwaitingPayment,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Reject a shipping address with any required field blank.
///
/// `line_2` is the only optional field.
///
/// # Errors
///
/// Returns [`CheckoutError::MissingField`] naming the first blank field.
pub fn validate_address(address: &ShippingAddress) -> Result<(), CheckoutError> {
    let required = [
        ("first_name", &address.first_name),
        ("last_name", &address.last_name),
        ("line_1", &address.line_1),
        ("city", &address.city),
        ("zip", &address.zip),
        ("phone", &address.phone),
    ];
    for (name, value) in required {
        if value.trim().is_empty() {
            return Err(CheckoutError::MissingField(name));
        }
    }
    Ok(())
}

/// Build the order request from cart lines.
///
/// Every product field the order schema requires is resolved here, so a
/// catalog document missing a description can never produce an invalid
/// request.
///
/// # Errors
///
/// Returns [`CheckoutError::EmptyCart`] when there are no lines, or a
/// validation error for the address.
pub fn build_order_request(
    lines: &[CartLine],
    shipping_address: ShippingAddress,
    payment_method: PaymentMethod,
) -> Result<OrderRequest, CheckoutError> {
    if lines.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    validate_address(&shipping_address)?;

    let items = lines
        .iter()
        .map(|line| OrderItem {
            product: OrderProduct {
                id: line.product.id.clone(),
                name: line.product.name.clone(),
                price: line.product.price,
                image: line.product.primary_image().map(str::to_owned),
                description: line.product.resolved_description().to_owned(),
                stock: line.product.stock,
            },
            quantity: line.quantity,
        })
        .collect();

    Ok(OrderRequest {
        items,
        shipping_address,
        payment_method,
    })
}

// =============================================================================
// CheckoutOrchestrator
// =============================================================================

/// Drives a single checkout attempt against the API.
pub struct CheckoutOrchestrator {
    api: ApiClient,
    cart: Arc<CartStore>,
    storage: Arc<dyn KvStore>,
    state: Mutex<CheckoutState>,
}

impl CheckoutOrchestrator {
    #[must_use]
    pub fn new(api: ApiClient, cart: Arc<CartStore>, storage: Arc<dyn KvStore>) -> Self {
        Self {
            api,
            cart,
            storage,
            state: Mutex::new(CheckoutState::Idle),
        }
    }

    #[must_use]
    pub fn state(&self) -> CheckoutState {
        self.state.lock().expect("checkout lock poisoned").clone()
    }

    fn set_state(&self, state: CheckoutState) {
        *self.state.lock().expect("checkout lock poisoned") = state;
    }

    /// The shipping address persisted by the last attempt, for form
    /// prefilling.
    #[must_use]
    pub fn saved_address(&self) -> Option<ShippingAddress> {
        match self.storage.get(keys::SHIPPING_ADDRESS) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(address) => Some(address),
                Err(e) => {
                    warn!(error = %e, "Discarding unreadable saved shipping address");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read saved shipping address");
                None
            }
        }
    }

    fn persist_address(&self, address: &ShippingAddress) {
        match serde_json::to_string(address) {
            Ok(json) => {
                if let Err(e) = self.storage.set(keys::SHIPPING_ADDRESS, &json) {
                    warn!(error = %e, "Failed to persist shipping address");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize shipping address"),
        }
    }

    fn finish_order(&self, order_id: OrderId) {
        self.cart.clear();
        if let Err(e) = self.storage.remove(keys::SHIPPING_ADDRESS) {
            warn!(error = %e, "Failed to remove saved shipping address");
        }
        info!(order_id = %order_id, "Checkout complete");
        self.set_state(CheckoutState::Succeeded { order_id });
    }

    /// Submit the cart as an order.
    ///
    /// Validation failures return an error and leave the state machine in
    /// `Idle`; once the request is in flight, failures land in
    /// [`CheckoutState::Failed`] with a user-facing message and the cart
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns a validation error before submission, or the API error that
    /// failed the attempt.
    #[instrument(skip(self, shipping_address), fields(payment_method = %payment_method))]
    pub async fn place_order(
        &self,
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
    ) -> Result<CheckoutState, CheckoutError> {
        {
            let mut state = self.state.lock().expect("checkout lock poisoned");
            if *state == CheckoutState::Submitting {
                return Err(CheckoutError::AlreadySubmitting);
            }
            *state = CheckoutState::Idle;
        }

        let request = build_order_request(&self.cart.lines(), shipping_address, payment_method)?;

        // Save the address before the network call so a retry prefills it.
        self.persist_address(&request.shipping_address);
        self.set_state(CheckoutState::Submitting);

        let created = match self.api.create_order(&request).await {
            Ok(created) => created,
            Err(e) => {
                warn!(error = %e, "Order submission failed");
                let failed = CheckoutState::Failed {
                    message: e.user_message(),
                };
                self.set_state(failed);
                return Err(e.into());
            }
        };

        match payment_method {
            PaymentMethod::Cod => {
                self.finish_order(created.id);
            }
            PaymentMethod::Card => match created.client_secret {
                Some(client_secret) => {
                    self.set_state(CheckoutState::AwaitingPayment {
                        order_id: created.id,
                        client_secret,
                    });
                }
                None => {
                    warn!(order_id = %created.id, "Card order created without a client secret");
                    self.set_state(CheckoutState::Failed {
                        message: "Payment could not be initialized".to_owned(),
                    });
                }
            },
        }

        Ok(self.state())
    }

    /// Record that the card payment confirmed; clears the cart and finishes
    /// the attempt.
    ///
    /// # Errors
    ///
    /// Returns an error unless the attempt is awaiting payment.
    pub fn confirm_card_payment(&self) -> Result<CheckoutState, CheckoutError> {
        let order_id = match self.state() {
            CheckoutState::AwaitingPayment { order_id, .. } => order_id,
            other => {
                warn!(state = ?other, "Payment confirmation outside AwaitingPayment");
                return Err(CheckoutError::NotAwaitingPayment);
            }
        };
        self.finish_order(order_id);
        Ok(self.state())
    }

    /// Record that the card payment failed. The order exists server-side
    /// with payment pending; the cart stays as it was.
    pub fn card_payment_failed(&self, message: impl Into<String>) -> CheckoutState {
        self.set_state(CheckoutState::Failed {
            message: message.into(),
        });
        self.state()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::CartLine;
    use mebius_core::Price;
    use serde_json::json;

    fn address() -> ShippingAddress {
        ShippingAddress {
            first_name: "Ada".to_owned(),
            last_name: "Lovelace".to_owned(),
            line_1: "12 Analytical Way".to_owned(),
            line_2: None,
            city: "London".to_owned(),
            zip: "E1 6AN".to_owned(),
            phone: "+44 20 7946 0000".to_owned(),
        }
    }

    fn line(id: &str, price: i64, quantity: u32, extra: serde_json::Value) -> CartLine {
        let mut product = json!({
            "_id": id,
            "name": format!("Product {id}"),
            "price": price,
            "stock": 10,
            "categoryId": "c1",
        });
        product
            .as_object_mut()
            .unwrap()
            .extend(extra.as_object().unwrap().clone());
        CartLine {
            product: serde_json::from_value(product).unwrap(),
            quantity,
        }
    }

    #[test]
    fn test_empty_cart_is_rejected() {
        let result = build_order_request(&[], address(), PaymentMethod::Cod);
        assert!(matches!(result, Err(CheckoutError::EmptyCart)));
    }

    #[test]
    fn test_blank_required_field_is_rejected() {
        let mut bad = address();
        bad.city = "   ".to_owned();
        let lines = vec![line("a", 10, 1, json!({}))];

        let result = build_order_request(&lines, bad, PaymentMethod::Cod);
        assert!(matches!(result, Err(CheckoutError::MissingField("city"))));
    }

    #[test]
    fn test_line_2_is_optional() {
        let mut addr = address();
        addr.line_2 = None;
        assert!(validate_address(&addr).is_ok());
    }

    #[test]
    fn test_request_carries_items_and_method() {
        let lines = vec![
            line("a", 10, 2, json!({"description": "A thing"})),
            line("b", 5, 1, json!({})),
        ];

        let request = build_order_request(&lines, address(), PaymentMethod::Card).unwrap();
        assert_eq!(request.items.len(), 2);
        assert_eq!(request.payment_method, PaymentMethod::Card);
        assert_eq!(request.items[0].quantity, 2);
        assert_eq!(request.items[0].product.price, Price::from(10));
    }

    #[test]
    fn test_description_fallback_chain() {
        let explicit = line("a", 10, 1, json!({"description": "Plain"}));
        let short = line("b", 10, 1, json!({"shortDescription": "Short"}));
        let detailed = line("c", 10, 1, json!({"detailedDescription": "Detailed"}));
        let none = line("d", 10, 1, json!({}));

        let request = build_order_request(
            &[explicit, short, detailed, none],
            address(),
            PaymentMethod::Cod,
        )
        .unwrap();

        let descriptions: Vec<&str> = request
            .items
            .iter()
            .map(|item| item.product.description.as_str())
            .collect();
        assert_eq!(
            descriptions,
            ["Plain", "Short", "Detailed", "No description available"]
        );
    }

    mod orchestrator {
        use super::*;
        use crate::api::{ApiClient, Anonymous};
        use crate::config::ApiConfig;
        use crate::storage::MemoryStore;
        use std::time::Duration;

        fn orchestrator() -> (CheckoutOrchestrator, Arc<CartStore>, Arc<MemoryStore>) {
            let config = ApiConfig {
                base_url: "http://localhost:9/api/".parse().unwrap(),
                timeout: Duration::from_millis(50),
            };
            let api = ApiClient::new(&config, Arc::new(Anonymous)).unwrap();
            let storage = Arc::new(MemoryStore::new());
            let cart = Arc::new(CartStore::load(
                Arc::clone(&storage) as Arc<dyn KvStore>
            ));
            let orchestrator = CheckoutOrchestrator::new(
                api,
                Arc::clone(&cart),
                Arc::clone(&storage) as Arc<dyn KvStore>,
            );
            (orchestrator, cart, storage)
        }

        #[tokio::test]
        async fn test_validation_failure_leaves_state_idle() {
            let (checkout, _, _) = orchestrator();

            let result = checkout.place_order(address(), PaymentMethod::Cod).await;
            assert!(matches!(result, Err(CheckoutError::EmptyCart)));
            assert_eq!(checkout.state(), CheckoutState::Idle);
        }

        #[tokio::test]
        async fn test_api_failure_keeps_cart_and_records_message() {
            // Port 9 (discard) is unreachable; the request itself fails.
            let (checkout, cart, _) = orchestrator();
            cart.add(
                serde_json::from_value(json!({
                    "_id": "a",
                    "name": "Product a",
                    "price": 10,
                    "stock": 5,
                    "categoryId": "c1",
                }))
                .unwrap(),
            );

            let result = checkout.place_order(address(), PaymentMethod::Cod).await;
            assert!(matches!(result, Err(CheckoutError::Api(_))));
            assert!(matches!(checkout.state(), CheckoutState::Failed { .. }));
            assert!(!cart.is_empty(), "cart must survive a failed attempt");
        }

        #[tokio::test]
        async fn test_address_persisted_before_submission() {
            let (checkout, cart, storage) = orchestrator();
            cart.add(
                serde_json::from_value(json!({
                    "_id": "a",
                    "name": "Product a",
                    "price": 10,
                    "stock": 5,
                    "categoryId": "c1",
                }))
                .unwrap(),
            );

            let _ = checkout.place_order(address(), PaymentMethod::Cod).await;

            let saved = storage.get(keys::SHIPPING_ADDRESS).unwrap();
            assert!(saved.is_some(), "address saved even when submission fails");
            assert_eq!(checkout.saved_address().unwrap().city, "London");
        }

        #[test]
        fn test_confirm_card_payment_finishes_order() {
            let (checkout, cart, storage) = orchestrator();
            cart.add(
                serde_json::from_value(json!({
                    "_id": "a",
                    "name": "Product a",
                    "price": 10,
                    "stock": 5,
                    "categoryId": "c1",
                }))
                .unwrap(),
            );
            checkout.persist_address(&address());
            checkout.set_state(CheckoutState::AwaitingPayment {
                order_id: OrderId::new("o1"),
                client_secret: "pi_secret".to_owned(),
            });

            let state = checkout.confirm_card_payment().unwrap();

            assert_eq!(
                state,
                CheckoutState::Succeeded {
                    order_id: OrderId::new("o1")
                }
            );
            assert!(cart.is_empty());
            assert_eq!(storage.get(keys::SHIPPING_ADDRESS).unwrap(), None);
        }

        #[test]
        fn test_confirm_outside_awaiting_payment_is_rejected() {
            let (checkout, _, _) = orchestrator();
            assert!(checkout.confirm_card_payment().is_err());
            assert_eq!(checkout.state(), CheckoutState::Idle);
        }

        #[test]
        fn test_card_payment_failure_keeps_cart() {
            let (checkout, cart, _) = orchestrator();
            cart.add(
                serde_json::from_value(json!({
                    "_id": "a",
                    "name": "Product a",
                    "price": 10,
                    "stock": 5,
                    "categoryId": "c1",
                }))
                .unwrap(),
            );
            checkout.set_state(CheckoutState::AwaitingPayment {
                order_id: OrderId::new("o1"),
                client_secret: "pi_secret".to_owned(),
            });

            let state = checkout.card_payment_failed("card declined");

            assert_eq!(
                state,
                CheckoutState::Failed {
                    message: "card declined".to_owned()
                }
            );
            assert!(!cart.is_empty());
        }
    }
}
