//! Core library for packing order items onto pallets.
//!
//! - Placement: Extreme-Point search with hard constraints (bounds,
//!   non-overlap, support, dynamic stability)
//! - Search: NSGA-II-style μ+λ evolution over product orderings, three
//!   objectives (heterogeneity down, compactness up, volume utilization up)
//! - Batch: one independent, deterministically seeded search per order
//!   across a bounded worker pool
//! - Data model is serde-serializable; CSV row shaping is provided in
//!   `export` and written by the CLI crate.
//!
//! Quick example:
//! ```ignore
//! use pallet_packer_core::{pack_order, Item, Order, PackerConfig};
//! # fn main() -> anyhow::Result<()> {
//! let order = Order::try_new(
//!     "o-1",
//!     vec![Item::new("product-a", 1, 300.0, 200.0, 150.0, 2.0)],
//! )?;
//! let cfg = PackerConfig::default();
//! let solution = pack_order(&order, &cfg, 42)?;
//! println!("pallets: {}", solution.pallets.len());
//! # Ok(()) }
//! ```

pub mod batch;
pub mod config;
pub mod constraints;
pub mod error;
pub mod export;
pub mod extreme_points;
pub mod ga;
pub mod geometry;
pub mod model;
pub mod packer;
pub mod pipeline;

pub use batch::*;
pub use config::*;
pub use error::*;
pub use export::*;
pub use model::*;
pub use pipeline::*;

/// Convenience prelude for common types and functions.
/// Importing `pallet_packer_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::batch::{pack_orders, BatchOptions, BatchReport};
    pub use crate::config::{PackerConfig, PackerConfigBuilder, StabilitySchedule};
    pub use crate::geometry::EPSILON;
    pub use crate::model::{
        Item, Order, OrderSolution, OrderStats, Pallet, PalletSpec, PlacedItem, Placement,
    };
    pub use crate::packer::extreme_point::EpPlacer;
    pub use crate::packer::{LayerConstructor, PassThrough};
    pub use crate::pipeline::{pack_order, pallet_budget};
}
