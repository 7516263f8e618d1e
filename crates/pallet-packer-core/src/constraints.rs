//! Hard-constraint predicates for tentative placements.
//!
//! All predicates are pure functions over pallet state; the placement engine
//! composes them in a fixed order (bounds, non-overlap, support, stability)
//! and short-circuits on the first failure.

use crate::config::StabilitySchedule;
use crate::geometry::EPSILON;
use crate::model::{Pallet, PlacedItem};

/// Base corners are inset this far toward the item centroid before the
/// corner-support test.
pub const CORNER_INSET: f64 = 10.0;

const SUPPORT_RULES: [(f64, usize); 3] = [(0.75, 2), (0.50, 3), (0.40, 4)];

/// Max corner within the pallet volume, with tolerance.
pub fn within_bounds(candidate: &PlacedItem, pallet: &Pallet) -> bool {
    let b = candidate.aabb();
    b.max[0] <= pallet.spec.length + EPSILON
        && b.max[1] <= pallet.spec.width + EPSILON
        && b.max[2] <= pallet.spec.max_height + EPSILON
}

/// No placed item penetrates the candidate by more than the tolerance.
pub fn no_overlap(candidate: &PlacedItem, pallet: &Pallet) -> bool {
    let b = candidate.aabb();
    !pallet.items().iter().any(|it| b.overlaps(&it.aabb()))
}

/// Support rule: floor-level items are always supported; stacked items need
/// enough supported base area and enough supported (inset) base corners.
///
/// The predicates are tried most-permissive-area first; any success
/// suffices:
/// - ratio >= 0.75 and >= 2 corners
/// - ratio >= 0.50 and >= 3 corners
/// - ratio >= 0.40 and all 4 corners
pub fn is_supported(candidate: &PlacedItem, pallet: &Pallet) -> bool {
    if candidate.placement.z <= EPSILON {
        return true;
    }

    let bearers: Vec<&PlacedItem> = pallet
        .items()
        .iter()
        .filter(|it| (candidate.placement.z - it.top()).abs() < EPSILON)
        .collect();
    if bearers.is_empty() {
        return false;
    }

    let cb = candidate.aabb();
    let supported_area: f64 = bearers
        .iter()
        .map(|it| cb.footprint_overlap(&it.aabb()))
        .sum();
    let ratio = supported_area / candidate.base_area();

    let corners = supported_corners(candidate, &bearers);

    SUPPORT_RULES
        .iter()
        .any(|&(min_ratio, min_corners)| ratio >= min_ratio && corners >= min_corners)
}

/// Counts the candidate's four base corners, inset toward its centroid, that
/// lie within the footprint of at least one bearer.
fn supported_corners(candidate: &PlacedItem, bearers: &[&PlacedItem]) -> usize {
    let b = candidate.aabb();
    let cx = (b.min[0] + b.max[0]) / 2.0;
    let cy = (b.min[1] + b.max[1]) / 2.0;
    let corners = [
        (b.min[0], b.min[1]),
        (b.max[0], b.min[1]),
        (b.min[0], b.max[1]),
        (b.max[0], b.max[1]),
    ];
    corners
        .iter()
        .filter(|&&(x, y)| {
            let ix = x + CORNER_INSET * (cx - x).signum();
            let iy = y + CORNER_INSET * (cy - y).signum();
            bearers
                .iter()
                .any(|it| it.aabb().footprint_contains(ix, iy))
        })
        .count()
}

impl StabilitySchedule {
    /// Lateral center-of-mass tolerance for a pallet that would hold
    /// `count` items with top height `top` out of `max_height`.
    ///
    /// Count-based: effectively off below 3 items, then 0.70 / 0.50 / 0.40
    /// as the stack grows. Fill-based: 0.3 + (1 - top/max_height) * 0.5,
    /// clamped to [0.3, 0.99], loosened by 0.2 below 3 items.
    pub fn tolerance(&self, count: usize, top: f64, max_height: f64) -> f64 {
        match self {
            StabilitySchedule::CountBased => match count {
                0..=2 => 0.99,
                3..=4 => 0.70,
                5..=9 => 0.50,
                _ => 0.40,
            },
            StabilitySchedule::FillBased => {
                let mut tau = (0.3 + (1.0 - top / max_height) * 0.5).clamp(0.3, 0.99);
                if count < 3 {
                    tau = (tau + 0.2).min(0.99);
                }
                tau
            }
        }
    }
}

/// Dynamic stability: with the candidate hypothetically committed, the
/// center-of-mass projection must stay within the schedule's tolerance of
/// the pallet center on both lateral axes.
pub fn is_stable(candidate: &PlacedItem, pallet: &Pallet, schedule: &StabilitySchedule) -> bool {
    let count = pallet.item_count() + 1;
    let top = pallet.top_height().max(candidate.top());
    let tau = schedule.tolerance(count, top, pallet.spec.max_height);

    let com = pallet.center_of_mass_with(candidate);
    let half_l = pallet.spec.length / 2.0;
    let half_w = pallet.spec.width / 2.0;
    (com[0] - half_l).abs() / half_l <= tau && (com[1] - half_w).abs() / half_w <= tau
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Item, Pallet, PalletSpec, Placement};

    fn placed(pid: &str, id: u32, dims: (f64, f64, f64), kg: f64, at: (f64, f64, f64)) -> PlacedItem {
        PlacedItem {
            item: Item::new(pid, id, dims.0, dims.1, dims.2, kg),
            placement: Placement {
                x: at.0,
                y: at.1,
                z: at.2,
                rotated: false,
            },
        }
    }

    fn pallet_with(items: Vec<PlacedItem>) -> Pallet {
        Pallet::from_items(0, PalletSpec::default(), items)
    }

    #[test]
    fn floor_items_are_always_supported() {
        let pallet = pallet_with(vec![]);
        let c = placed("a", 1, (100.0, 100.0, 100.0), 1.0, (0.0, 0.0, 0.0));
        assert!(is_supported(&c, &pallet));
    }

    #[test]
    fn airborne_item_without_bearers_is_unsupported() {
        let pallet = pallet_with(vec![]);
        let c = placed("a", 1, (100.0, 100.0, 100.0), 1.0, (0.0, 0.0, 200.0));
        assert!(!is_supported(&c, &pallet));
    }

    #[test]
    fn full_coverage_stack_is_supported() {
        let base = placed("a", 1, (200.0, 200.0, 100.0), 2.0, (0.0, 0.0, 0.0));
        let pallet = pallet_with(vec![base]);
        let c = placed("b", 2, (200.0, 200.0, 100.0), 1.0, (0.0, 0.0, 100.0));
        assert!(is_supported(&c, &pallet));
    }

    #[test]
    fn small_overhang_fails_support() {
        // Bearer covers less than 40% of the candidate base.
        let base = placed("a", 1, (100.0, 100.0, 100.0), 2.0, (0.0, 0.0, 0.0));
        let pallet = pallet_with(vec![base]);
        let c = placed("b", 2, (300.0, 300.0, 100.0), 1.0, (0.0, 0.0, 100.0));
        assert!(!is_supported(&c, &pallet));
    }

    #[test]
    fn bearer_height_must_be_flush() {
        let base = placed("a", 1, (200.0, 200.0, 100.0), 2.0, (0.0, 0.0, 0.0));
        let pallet = pallet_with(vec![base]);
        // Floating 5mm above the bearer's top face.
        let c = placed("b", 2, (200.0, 200.0, 100.0), 1.0, (0.0, 0.0, 105.0));
        assert!(!is_supported(&c, &pallet));
    }

    #[test]
    fn bounds_respects_tolerance() {
        let pallet = pallet_with(vec![]);
        let exact = placed("a", 1, (1200.0, 800.0, 1400.0), 5.0, (0.0, 0.0, 0.0));
        assert!(within_bounds(&exact, &pallet));
        let over = placed("a", 2, (1201.0, 800.0, 1400.0), 5.0, (0.0, 0.0, 0.0));
        assert!(!within_bounds(&over, &pallet));
    }

    #[test]
    fn overlap_check_rejects_penetration() {
        let base = placed("a", 1, (200.0, 200.0, 100.0), 2.0, (0.0, 0.0, 0.0));
        let pallet = pallet_with(vec![base]);
        let clash = placed("b", 2, (200.0, 200.0, 100.0), 1.0, (100.0, 100.0, 0.0));
        assert!(!no_overlap(&clash, &pallet));
        let beside = placed("b", 3, (200.0, 200.0, 100.0), 1.0, (200.0, 0.0, 0.0));
        assert!(no_overlap(&beside, &pallet));
    }

    #[test]
    fn count_schedule_steps_down() {
        let s = StabilitySchedule::CountBased;
        assert_eq!(s.tolerance(1, 0.0, 1400.0), 0.99);
        assert_eq!(s.tolerance(3, 0.0, 1400.0), 0.70);
        assert_eq!(s.tolerance(5, 0.0, 1400.0), 0.50);
        assert_eq!(s.tolerance(10, 0.0, 1400.0), 0.40);
    }

    #[test]
    fn fill_schedule_stays_clamped() {
        let s = StabilitySchedule::FillBased;
        for count in [0usize, 2, 5, 20] {
            for top in [0.0, 700.0, 1400.0] {
                let tau = s.tolerance(count, top, 1400.0);
                assert!((0.3..=0.99).contains(&tau));
            }
        }
    }

    #[test]
    fn early_items_pass_stability_anywhere() {
        let pallet = pallet_with(vec![]);
        let corner = placed("a", 1, (100.0, 100.0, 100.0), 5.0, (1100.0, 700.0, 0.0));
        assert!(is_stable(&corner, &pallet, &StabilitySchedule::CountBased));
    }

    #[test]
    fn lopsided_full_pallet_fails_stability() {
        // Ten heavy items piled into one corner, then one more.
        let mut items = Vec::new();
        for i in 0..10 {
            items.push(placed(
                "a",
                i,
                (100.0, 100.0, 100.0),
                20.0,
                (0.0, 0.0, i as f64 * 100.0),
            ));
        }
        let pallet = pallet_with(items);
        let next = placed("a", 99, (100.0, 100.0, 100.0), 20.0, (0.0, 0.0, 1000.0));
        assert!(!is_stable(&next, &pallet, &StabilitySchedule::CountBased));
    }
}
