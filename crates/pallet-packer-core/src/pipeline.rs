use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, instrument};

use crate::config::PackerConfig;
use crate::error::Result;
use crate::ga::evaluator::group_items;
use crate::ga::nsga2::Search;
use crate::ga::seeds::summarize_products;
use crate::model::{Order, OrderSolution, PalletSpec};
use crate::packer::{LayerConstructor, PassThrough};

/// Name recorded in the solution and the summary report.
pub const ALGORITHM: &str = "ep-nsga2";

/// Items per pallet assumed when widening the pallet budget for large
/// orders.
const ITEMS_PER_PALLET_ESTIMATE: usize = 50;

/// Pallet budget for an order: the configured base, widened for large
/// orders.
pub fn pallet_budget(cfg: &PackerConfig, item_count: usize) -> usize {
    cfg.base_max_pallets
        .max(item_count.div_ceil(ITEMS_PER_PALLET_ESTIMATE))
}

#[instrument(skip_all, fields(order_id = %order.order_id))]
/// Packs one order: layer construction (currently a pass-through), then the
/// evolutionary search over product orderings, then deterministic
/// re-application of the winning ordering.
///
/// Notes:
/// - `seed` fully determines the result; the same order and seed always
///   produce identical placements.
/// - An order that never fits the pallet budget commits nothing: zero
///   pallets, every item reported unplaced.
pub fn pack_order(order: &Order, cfg: &PackerConfig, seed: u64) -> Result<OrderSolution> {
    cfg.validate()?;
    let start = Instant::now();

    let mut solution = OrderSolution {
        order_id: order.order_id.clone(),
        algorithm: ALGORITHM.to_string(),
        item_count: order.items.len(),
        product_types: order.distinct_products().len(),
        entropy: order.entropy(),
        complexity: order.complexity_class(),
        pallets: Vec::new(),
        unplaced: Vec::new(),
        generations: 0,
        elapsed_ms: 0.0,
    };

    if order.items.is_empty() {
        solution.elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        return Ok(solution);
    }

    let spec = PalletSpec::from_config(cfg);
    let constructor = PassThrough;
    let (mut pallets, residuals) = constructor.construct(spec, order.items.clone());

    let residual_order = Order {
        order_id: order.order_id.clone(),
        items: residuals,
    };
    let products = summarize_products(&residual_order);
    let groups = group_items(&residual_order, &products);
    let budget = pallet_budget(cfg, residual_order.items.len());

    let rng = StdRng::seed_from_u64(seed);
    let outcome = Search::new(cfg, &products, &groups, budget, rng).run();

    match outcome {
        Some(outcome) => {
            debug!(
                generations = outcome.generations,
                pallets = outcome.evaluation.pallets.len(),
                "search converged"
            );
            let offset = pallets.len();
            pallets.extend(outcome.evaluation.pallets.into_iter().map(|mut p| {
                p.id += offset;
                p
            }));
            solution.generations = outcome.generations;
        }
        None => {
            debug!("no valid ordering within the pallet budget");
            solution.unplaced = residual_order.items;
        }
    }
    solution.pallets = pallets;
    solution.elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    Ok(solution)
}
