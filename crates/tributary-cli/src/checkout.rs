//! Cart checkout: parallel price validation, then a parallel total.

use tributary_core::{AggregateError, AggregationRequest, Aggregator};

use crate::domain::{Cart, CartItem, CheckoutResponse};
use crate::services::PriceValidatorService;

pub struct CheckoutService {
    aggregator: Aggregator,
    validator: PriceValidatorService,
}

impl CheckoutService {
    pub fn new(aggregator: Aggregator, validator: PriceValidatorService) -> Self {
        Self {
            aggregator,
            validator,
        }
    }

    /// FAILURE with every invalid item (input order), or SUCCESS with
    /// `Σ quantity * rate`.
    pub fn checkout(&self, cart: &Cart) -> Result<CheckoutResponse, AggregateError> {
        let invalid = self.invalid_items(cart)?;
        if !invalid.is_empty() {
            tracing::info!(
                "cart {} rejected: {} invalid item(s)",
                cart.cart_id,
                invalid.len()
            );
            return Ok(CheckoutResponse::failure(invalid));
        }

        let request = AggregationRequest::mapping(cart.cart_items.clone(), CartItem::line_total)
            .fold(0.0, |a, b| a + b);
        let final_rate = self
            .aggregator
            .aggregate(request)?
            .into_scalar()
            .unwrap_or_default();
        tracing::info!("cart {} accepted: final_rate={final_rate:.2}", cart.cart_id);
        Ok(CheckoutResponse::success(final_rate))
    }

    fn invalid_items(&self, cart: &Cart) -> Result<Vec<CartItem>, AggregateError> {
        let validator = self.validator.clone();
        let request = AggregationRequest::mapping(cart.cart_items.clone(), move |item: &CartItem| {
            let mut item = item.clone();
            item.expired = validator.is_cart_item_invalid(&item);
            item
        })
        .filter(|item| item.expired);

        Ok(self
            .aggregator
            .aggregate(request)?
            .into_items()
            .unwrap_or_default())
    }
}
