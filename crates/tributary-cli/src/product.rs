//! Product details assembled from independent info / review / inventory calls.

use tributary_core::combine::join_all;
use tributary_core::{FutureHandle, Stopwatch, TaskError, TaskScheduler, TimingReport};

use crate::domain::{Product, ProductInfo, ProductOption};
use crate::services::{InventoryService, ProductInfoService, ReviewService};

pub struct ProductService {
    scheduler: TaskScheduler,
    product_info: ProductInfoService,
    reviews: ReviewService,
    inventory: InventoryService,
}

impl ProductService {
    pub fn new(
        scheduler: TaskScheduler,
        product_info: ProductInfoService,
        reviews: ReviewService,
        inventory: InventoryService,
    ) -> Self {
        Self {
            scheduler,
            product_info,
            reviews,
            inventory,
        }
    }

    /// Blocking variant: info and reviews fetched concurrently, then joined.
    pub fn retrieve_product_details(&self, product_id: &str) -> Result<(Product, TimingReport), TaskError> {
        let watch = Stopwatch::start(format!("product {product_id}"));
        let product = self.retrieve_product_details_async(product_id).get()?;
        Ok((product, watch.stop()))
    }

    /// Non-blocking variant; the caller decides how to wait.
    pub fn retrieve_product_details_async(&self, product_id: &str) -> FutureHandle<Product> {
        let info = self.fetch_info(product_id);
        let review = {
            let rs = self.reviews.clone();
            let id = product_id.to_string();
            self.scheduler.submit(move || rs.retrieve_reviews(&id))
        };

        let id = product_id.to_string();
        info.combine(&review, move |product_info, review| Product {
            product_id: id,
            product_info,
            review,
        })
    }

    /// Like `retrieve_product_details`, with every option's inventory
    /// fetched in parallel once the product info is known.
    pub fn retrieve_product_details_with_inventory(
        &self,
        product_id: &str,
    ) -> Result<(Product, TimingReport), TaskError> {
        let watch = Stopwatch::start(format!("product+inventory {product_id}"));

        let scheduler = self.scheduler.clone();
        let inventory = self.inventory.clone();
        let info = self
            .fetch_info(product_id)
            .and_then(move |info| with_inventory(&scheduler, &inventory, info));

        let review = {
            let rs = self.reviews.clone();
            let id = product_id.to_string();
            self.scheduler.submit(move || rs.retrieve_reviews(&id))
        };

        let id = product_id.to_string();
        let product = info
            .combine(&review, move |product_info, review| Product {
                product_id: id,
                product_info,
                review,
            })
            .get()?;
        Ok((product, watch.stop()))
    }

    fn fetch_info(&self, product_id: &str) -> FutureHandle<ProductInfo> {
        let pis = self.product_info.clone();
        let id = product_id.to_string();
        self.scheduler.submit(move || pis.retrieve_product_info(&id))
    }
}

/// One inventory lookup per option, joined back in option order.
fn with_inventory(
    scheduler: &TaskScheduler,
    inventory: &InventoryService,
    info: ProductInfo,
) -> FutureHandle<ProductInfo> {
    let lookups: Vec<FutureHandle<ProductOption>> = info
        .product_options
        .iter()
        .cloned()
        .map(|option| {
            let inventory = inventory.clone();
            scheduler.submit(move || {
                let mut option = option;
                option.inventory = Some(inventory.add_inventory(&option));
                option
            })
        })
        .collect();

    join_all(scheduler.pool(), lookups).map(move |product_options| ProductInfo {
        product_options,
        ..info
    })
}
