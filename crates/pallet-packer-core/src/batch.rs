use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::config::PackerConfig;
use crate::error::{PalletPackerError, Result};
use crate::model::{Order, OrderSolution};
use crate::pipeline::pack_order;

/// Batch driver options.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Base seed; each order derives its own disjoint RNG stream from it.
    pub base_seed: u64,
    /// Worker count. `None` clamps the machine's parallelism to [2, 8];
    /// an explicit value is used as given.
    pub parallelism: Option<usize>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            base_seed: 42,
            parallelism: None,
        }
    }
}

impl BatchOptions {
    pub fn worker_count(&self) -> usize {
        match self.parallelism {
            Some(n) => n.max(1),
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
                .clamp(2, 8),
        }
    }
}

/// An order that failed with a caught panic rather than a packing result.
#[derive(Debug, Clone)]
pub struct FailedOrder {
    pub order_id: String,
    pub message: String,
}

/// Outcome of a batch run: solutions sorted by order id, plus the orders
/// that failed outright.
#[derive(Debug)]
pub struct BatchReport {
    pub solutions: Vec<OrderSolution>,
    pub failed: Vec<FailedOrder>,
}

/// FNV-1a over the order id. The per-order seed must be identical across
/// runs and platforms, which rules out the std hasher.
pub fn stable_hash(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in s.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Seed for one order's RNG stream, disjoint from every other order's.
pub fn order_seed(base_seed: u64, order_id: &str) -> u64 {
    base_seed.wrapping_add(stable_hash(order_id))
}

/// Runs one independent search per order across a bounded worker pool.
///
/// Results are deterministic for a given base seed regardless of the worker
/// count or scheduling: each order's seed depends only on the base seed and
/// the order id, and the report is sorted by order id before it is
/// returned. A panicking order is caught, recorded, and does not disturb
/// the rest of the batch.
pub fn pack_orders(
    orders: &[Order],
    cfg: &PackerConfig,
    opts: &BatchOptions,
) -> Result<BatchReport> {
    cfg.validate()?;

    let workers = opts.worker_count();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| PalletPackerError::InvalidConfig(format!("worker pool: {e}")))?;

    info!(orders = orders.len(), workers, "starting batch run");

    let done = AtomicUsize::new(0);
    let failed = Mutex::new(Vec::new());

    let mut solutions: Vec<OrderSolution> = pool.install(|| {
        orders
            .par_iter()
            .filter_map(|order| {
                let seed = order_seed(opts.base_seed, &order.order_id);
                let result =
                    catch_unwind(AssertUnwindSafe(|| pack_order(order, cfg, seed)));
                let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                match result {
                    Ok(Ok(solution)) => {
                        info!(
                            order_id = %solution.order_id,
                            progress = format!("{finished}/{}", orders.len()),
                            pallets = solution.pallets.len(),
                            unplaced = solution.unplaced.len(),
                            "order finished"
                        );
                        Some(solution)
                    }
                    Ok(Err(e)) => {
                        warn!(order_id = %order.order_id, error = %e, "order failed");
                        failed.lock().unwrap().push(FailedOrder {
                            order_id: order.order_id.clone(),
                            message: e.to_string(),
                        });
                        None
                    }
                    Err(panic) => {
                        let message = panic_message(&panic);
                        warn!(order_id = %order.order_id, message, "order panicked");
                        failed.lock().unwrap().push(FailedOrder {
                            order_id: order.order_id.clone(),
                            message,
                        });
                        None
                    }
                }
            })
            .collect()
    });

    // Emission order is defined by order id, never by scheduling.
    solutions.sort_by(|a, b| a.order_id.cmp(&b.order_id));
    let mut failed = failed.into_inner().unwrap();
    failed.sort_by(|a, b| a.order_id.cmp(&b.order_id));

    Ok(BatchReport { solutions, failed })
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_hash_is_stable() {
        // Pinned values: changing the hash silently reseeds every order.
        assert_eq!(stable_hash(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(stable_hash("16129"), stable_hash("16129"));
        assert_ne!(stable_hash("16129"), stable_hash("16130"));
    }

    #[test]
    fn order_seeds_are_disjoint_per_order() {
        let a = order_seed(42, "order-a");
        let b = order_seed(42, "order-b");
        assert_ne!(a, b);
        assert_eq!(a, order_seed(42, "order-a"));
    }

    #[test]
    fn default_worker_count_is_clamped() {
        let opts = BatchOptions::default();
        let n = opts.worker_count();
        assert!((2..=8).contains(&n));

        let explicit = BatchOptions {
            parallelism: Some(12),
            ..Default::default()
        };
        assert_eq!(explicit.worker_count(), 12);
    }
}
