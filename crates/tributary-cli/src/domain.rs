//! Records returned by the demo services.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub product_id: String,
    pub product_options: Vec<ProductOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductOption {
    pub product_option_id: u32,
    pub size: String,
    pub color: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<Inventory>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub no_of_reviews: u32,
    pub overall_rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,
    pub product_info: ProductInfo,
    pub review: Review,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub item_id: u32,
    pub item_name: String,
    pub rate: f64,
    pub quantity: u32,
    #[serde(default)]
    pub expired: bool,
}

impl CartItem {
    pub fn line_total(&self) -> f64 {
        self.quantity as f64 * self.rate
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub cart_id: u32,
    pub cart_items: Vec<CartItem>,
}

/// Serialized as SUCCESS / FAILURE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckoutStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub checkout_status: CheckoutStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub error_list: Vec<CartItem>,
    pub final_rate: f64,
}

impl CheckoutResponse {
    pub fn success(final_rate: f64) -> Self {
        Self {
            checkout_status: CheckoutStatus::Success,
            error_list: Vec::new(),
            final_rate,
        }
    }

    pub fn failure(error_list: Vec<CartItem>) -> Self {
        Self {
            checkout_status: CheckoutStatus::Failure,
            error_list,
            final_rate: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_status_serializes_screaming() {
        let s = serde_json::to_string(&CheckoutStatus::Success).unwrap();
        assert_eq!(s, "\"SUCCESS\"");
        let s = serde_json::to_string(&CheckoutStatus::Failure).unwrap();
        assert_eq!(s, "\"FAILURE\"");
    }

    #[test]
    fn failure_response_lists_invalid_items() {
        let item = CartItem {
            item_id: 7,
            item_name: "Item 7".to_string(),
            rate: 2.5,
            quantity: 7,
            expired: true,
        };
        let v = serde_json::to_value(CheckoutResponse::failure(vec![item])).unwrap();
        assert_eq!(v["checkout_status"], "FAILURE");
        assert_eq!(v["error_list"][0]["item_id"], 7);
    }
}
