use crate::config::{PackerConfig, StabilitySchedule};
use crate::constraints;
use crate::model::{Item, Pallet, PlacedItem, Placement};

/// Extreme-point placement engine.
///
/// Walks a pallet's extreme points in priority order, trying each requested
/// orientation, and commits the first placement that passes every hard
/// constraint. Failure leaves the pallet untouched; the caller decides
/// whether to open a fresh pallet or give up on the item.
#[derive(Debug, Clone)]
pub struct EpPlacer {
    allow_rotation: bool,
    stability: StabilitySchedule,
}

impl EpPlacer {
    pub fn new(cfg: &PackerConfig) -> Self {
        Self {
            allow_rotation: cfg.allow_rotation,
            stability: cfg.stability.clone(),
        }
    }

    /// Engine with rotation forced off, regardless of config.
    pub fn without_rotation(cfg: &PackerConfig) -> Self {
        Self {
            allow_rotation: false,
            stability: cfg.stability.clone(),
        }
    }

    /// Tries to place `item` on `pallet`. On success the pallet gains the
    /// item, the consumed extreme point is flagged, and the three derived
    /// points are inserted.
    pub fn try_place(&self, pallet: &mut Pallet, item: &Item) -> Option<Placement> {
        let orientations: &[bool] = if self.allow_rotation {
            &[false, true]
        } else {
            &[false]
        };

        let mut chosen: Option<(usize, Placement)> = None;
        'search: for (idx, ep) in pallet.eps().iter_unused() {
            for &rotated in orientations {
                let placement = Placement {
                    x: ep.x,
                    y: ep.y,
                    z: ep.z,
                    rotated,
                };
                let candidate = PlacedItem {
                    item: item.clone(),
                    placement,
                };
                if !constraints::within_bounds(&candidate, pallet) {
                    continue;
                }
                if !constraints::no_overlap(&candidate, pallet) {
                    continue;
                }
                if !constraints::is_supported(&candidate, pallet) {
                    continue;
                }
                if !constraints::is_stable(&candidate, pallet, &self.stability) {
                    continue;
                }
                chosen = Some((idx, placement));
                break 'search;
            }
        }

        let (ep_idx, placement) = chosen?;
        let placed = PlacedItem {
            item: item.clone(),
            placement,
        };
        let (cl, cw, ch) = (
            placed.current_length(),
            placed.current_width(),
            placed.current_height(),
        );
        pallet.eps_mut().mark_used(ep_idx);
        pallet.push_item(placed);

        let eps = pallet.eps_mut();
        eps.insert(placement.x + cl, placement.y, placement.z);
        eps.insert(placement.x, placement.y + cw, placement.z);
        eps.insert(placement.x, placement.y, placement.z + ch);
        eps.sort();

        Some(placement)
    }
}
