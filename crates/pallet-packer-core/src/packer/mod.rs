use crate::model::{Item, Pallet, PalletSpec};

pub mod extreme_point;

/// A layer constructor pre-packs whole pallets from an item set and hands
/// the residual items to the evolutionary search.
///
/// Implementations must ensure every returned pallet satisfies the hard
/// constraints; residuals are items they chose not to place.
pub trait LayerConstructor {
    fn construct(&self, spec: PalletSpec, items: Vec<Item>) -> (Vec<Pallet>, Vec<Item>);
}

/// Identity constructor: builds no pallets, passes every item through as a
/// residual. Stands in until a real layer/block constructor exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThrough;

impl LayerConstructor for PassThrough {
    fn construct(&self, _spec: PalletSpec, items: Vec<Item>) -> (Vec<Pallet>, Vec<Item>) {
        (Vec::new(), items)
    }
}
