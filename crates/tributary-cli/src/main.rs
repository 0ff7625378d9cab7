//! tributary demo CLI
//!
//! 各サブコマンドは共有ワーカープール 1 つの上で合成／集約を実行し、
//! 結果と経過時間を表示する（`--json` で JSON 出力）。

mod checkout;
mod domain;
mod hello;
mod multiply;
mod product;
mod services;

use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use tributary_core::{PoolConfig, Stopwatch, TaskScheduler, TimingReport, timing::timed};

use crate::checkout::CheckoutService;
use crate::hello::HelloComposer;
use crate::product::ProductService;
use crate::services::{
    DataSet, HelloWorldService, InventoryService, PriceValidatorService, ProductInfoService,
    ReviewService,
};

// ── CLI ─────────────────────────────────────────────────────────────

/// Compose latency-bearing calls and aggregate collections on one worker pool.
#[derive(Parser, Debug)]
#[command(name = "tributary", version, about)]
struct Cli {
    /// Worker threads (defaults to available parallelism).
    #[arg(long, global = true, env = "TRIBUTARY_WORKER_THREADS")]
    workers: Option<usize>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Simulated service latency in milliseconds.
    #[arg(long, global = true, default_value_t = 100)]
    latency_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Greeting compositions (1 to 4 joined calls).
    Hello,

    /// Product details from info, reviews and per-option inventory.
    Product {
        #[arg(default_value = "ABC123")]
        product_id: String,

        /// Also fetch inventory for every product option.
        #[arg(long)]
        inventory: bool,

        /// Wait through the async bridge instead of blocking.
        #[arg(long = "async")]
        use_async: bool,
    },

    /// Validate and price a generated cart.
    Checkout {
        #[arg(long, default_value_t = 6)]
        items: u32,
    },

    /// Multiply 1..=count by a factor.
    Multiply {
        #[arg(long, default_value_t = 1_000_000)]
        count: u64,

        #[arg(long, default_value_t = 2)]
        factor: u64,

        /// Run on the calling thread instead of the pool.
        #[arg(long)]
        sequential: bool,
    },
}

#[derive(Serialize)]
struct Timed<T: Serialize> {
    result: T,
    timing: TimingReport,
}

fn emit<T: Serialize + std::fmt::Debug>(json: bool, result: T, timing: TimingReport) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&Timed { result, timing })?);
    } else {
        println!("{result:#?}");
        println!("{}: {} ms", timing.label, timing.elapsed_millis());
    }
    Ok(())
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = PoolConfig::from_env();
    if let Some(n) = cli.workers {
        config = config.with_worker_threads(n);
    }
    let scheduler = TaskScheduler::with_config(&config).context("building worker pool")?;
    info!(workers = scheduler.pool().worker_threads(), "worker pool ready");

    let latency = Duration::from_millis(cli.latency_ms);

    match cli.command {
        Command::Hello => {
            let composer = HelloComposer::new(scheduler, HelloWorldService::new(latency), latency);
            let (single, timing) = timed("hello_world", || composer.hello_world().get());
            emit(cli.json, single?, timing)?;
            let (length, timing) = timed("test_length", || composer.test_length().get());
            emit(cli.json, length?, timing)?;
            for (greeting, timing) in [
                composer.two_calls()?,
                composer.three_calls()?,
                composer.four_calls()?,
            ] {
                emit(cli.json, greeting, timing)?;
            }
        }

        Command::Product {
            product_id,
            inventory,
            use_async,
        } => {
            let service = ProductService::new(
                scheduler,
                ProductInfoService::new(latency),
                ReviewService::new(latency),
                InventoryService::new(latency),
            );
            let (product, timing) = if inventory {
                service.retrieve_product_details_with_inventory(&product_id)?
            } else if use_async {
                let watch = Stopwatch::start(format!("product {product_id} (async)"));
                let product = service
                    .retrieve_product_details_async(&product_id)
                    .wait()
                    .await?;
                (product, watch.stop())
            } else {
                service.retrieve_product_details(&product_id)?
            };
            emit(cli.json, product, timing)?;
        }

        Command::Checkout { items } => {
            let cart = DataSet::create_cart(items);
            let service = CheckoutService::new(
                scheduler.aggregator(),
                PriceValidatorService::new(latency),
            );
            let (response, timing) = timed(format!("checkout {items} items"), || service.checkout(&cart));
            emit(cli.json, response?, timing)?;
        }

        Command::Multiply {
            count,
            factor,
            sequential,
        } => {
            let aggregator = scheduler.aggregator();
            let (values, timing) = timed("multiply_each_value", || {
                multiply::multiply_each_value(&aggregator, DataSet::values(count), factor, !sequential)
            });
            let values = values?;
            let summary = MultiplySummary {
                count: values.len(),
                first: values.first().copied(),
                last: values.last().copied(),
            };
            emit(cli.json, summary, timing)?;
        }
    }

    Ok(())
}

/// Printing a million values is not useful; show the ends.
#[derive(Debug, Serialize)]
struct MultiplySummary {
    count: usize,
    first: Option<u64>,
    last: Option<u64>,
}
