//! Demo services. Plain synchronous functions that sleep to simulate latency;
//! they are only ever called from inside work units.

use std::thread::sleep;
use std::time::Duration;

use rand::Rng;

use crate::domain::{Cart, CartItem, Inventory, ProductInfo, ProductOption, Review};

/// Greeting fragments.
#[derive(Debug, Clone)]
pub struct HelloWorldService {
    latency: Duration,
}

impl HelloWorldService {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    pub fn hello_world(&self) -> String {
        sleep(self.latency);
        tracing::debug!("inside hello_world");
        "hello world".to_string()
    }

    pub fn hello(&self) -> String {
        sleep(self.latency);
        tracing::debug!("inside hello");
        "hello".to_string()
    }

    pub fn world(&self) -> String {
        sleep(self.latency);
        tracing::debug!("inside world");
        " world!".to_string()
    }

    pub fn test_length(&self, input: &str) -> String {
        sleep(self.latency);
        input.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct ProductInfoService {
    latency: Duration,
}

impl ProductInfoService {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    pub fn retrieve_product_info(&self, product_id: &str) -> ProductInfo {
        sleep(self.latency);
        let product_options = vec![
            ProductOption {
                product_option_id: 1,
                size: "64GB".to_string(),
                color: "Black".to_string(),
                price: 699.99,
                inventory: None,
            },
            ProductOption {
                product_option_id: 2,
                size: "128GB".to_string(),
                color: "Black".to_string(),
                price: 749.99,
                inventory: None,
            },
        ];
        ProductInfo {
            product_id: product_id.to_string(),
            product_options,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReviewService {
    latency: Duration,
}

impl ReviewService {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    pub fn retrieve_reviews(&self, _product_id: &str) -> Review {
        sleep(self.latency);
        Review {
            no_of_reviews: 200,
            overall_rating: 4.5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InventoryService {
    latency: Duration,
}

impl InventoryService {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    pub fn add_inventory(&self, _option: &ProductOption) -> Inventory {
        sleep(self.latency);
        Inventory { count: 2 }
    }
}

/// Flags cart items whose price can no longer be honored.
#[derive(Debug, Clone)]
pub struct PriceValidatorService {
    latency: Duration,
}

impl PriceValidatorService {
    /// Items with these ids are always reported invalid.
    pub const INVALID_ITEM_IDS: [u32; 3] = [7, 9, 11];

    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    pub fn is_cart_item_invalid(&self, item: &CartItem) -> bool {
        sleep(self.latency);
        Self::INVALID_ITEM_IDS.contains(&item.item_id)
    }
}

/// Test/demo data.
pub struct DataSet;

impl DataSet {
    /// Items `1..=n`, quantity equal to the id, random rate in `[1, 100)`.
    pub fn create_cart(n: u32) -> Cart {
        let mut rng = rand::thread_rng();
        let cart_items = (1..=n)
            .map(|id| CartItem {
                item_id: id,
                item_name: format!("Item {id}"),
                rate: rng.gen_range(1.0..100.0),
                quantity: id,
                expired: false,
            })
            .collect();
        Cart {
            cart_id: 1,
            cart_items,
        }
    }

    pub fn values(n: u64) -> Vec<u64> {
        (1..=n).collect()
    }
}
