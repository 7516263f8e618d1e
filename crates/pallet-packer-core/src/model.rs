use crate::extreme_points::EpSet;
use crate::geometry::{weighted_center_of_mass, Aabb, EPSILON};
use serde::{Deserialize, Serialize};

/// A physical box to place. Identity and nominal extents are immutable;
/// position and orientation live in [`Placement`] once the item is committed
/// to a pallet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    /// Product identity; items of the same product share it.
    pub product_id: String,
    /// Unique within an order.
    pub item_id: u32,
    /// Nominal length in mm (X before rotation).
    pub length: f64,
    /// Nominal width in mm (Y before rotation).
    pub width: f64,
    /// Height in mm; rotation is about the vertical axis only.
    pub height: f64,
    /// Weight in kg.
    pub weight: f64,
}

impl Item {
    pub fn new(
        product_id: impl Into<String>,
        item_id: u32,
        length: f64,
        width: f64,
        height: f64,
        weight: f64,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            item_id,
            length,
            width,
            height,
            weight,
        }
    }

    pub fn volume(&self) -> f64 {
        self.length * self.width * self.height
    }

    pub fn base_area(&self) -> f64 {
        self.length * self.width
    }
}

/// Position of an item's minimum corner plus its orientation. The only
/// representable rotation is 90° about Z.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub rotated: bool,
}

/// An item committed to a pallet at a concrete placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedItem {
    pub item: Item,
    pub placement: Placement,
}

impl PlacedItem {
    /// Current X extent (swapped with width when rotated).
    pub fn current_length(&self) -> f64 {
        if self.placement.rotated {
            self.item.width
        } else {
            self.item.length
        }
    }

    /// Current Y extent.
    pub fn current_width(&self) -> f64 {
        if self.placement.rotated {
            self.item.length
        } else {
            self.item.width
        }
    }

    pub fn current_height(&self) -> f64 {
        self.item.height
    }

    /// Top face height (`z + height`).
    pub fn top(&self) -> f64 {
        self.placement.z + self.item.height
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::from_extents(
            [self.placement.x, self.placement.y, self.placement.z],
            [
                self.current_length(),
                self.current_width(),
                self.current_height(),
            ],
        )
    }

    pub fn base_area(&self) -> f64 {
        self.current_length() * self.current_width()
    }

    pub fn surface_area(&self) -> f64 {
        let (l, w, h) = (
            self.current_length(),
            self.current_width(),
            self.current_height(),
        );
        2.0 * (l * w + l * h + w * h)
    }
}

/// Pallet extents in mm. Default is a Euro pallet footprint with a 1400 mm
/// stack limit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PalletSpec {
    pub length: f64,
    pub width: f64,
    pub max_height: f64,
}

impl Default for PalletSpec {
    fn default() -> Self {
        Self {
            length: 1200.0,
            width: 800.0,
            max_height: 1400.0,
        }
    }
}

impl PalletSpec {
    pub fn new(length: f64, width: f64, max_height: f64) -> Self {
        Self {
            length,
            width,
            max_height,
        }
    }

    pub fn from_config(cfg: &crate::config::PackerConfig) -> Self {
        Self {
            length: cfg.pallet_length,
            width: cfg.pallet_width,
            max_height: cfg.pallet_max_height,
        }
    }

    pub fn volume(&self) -> f64 {
        self.length * self.width * self.max_height
    }

    /// Geometric center; also the center-of-mass fallback for empty pallets.
    pub fn center(&self) -> [f64; 3] {
        [self.length / 2.0, self.width / 2.0, self.max_height / 2.0]
    }
}

/// A pallet under construction: placed items (insertion order preserved) and
/// the extreme-point set driving further placements. Items are owned by
/// value; there are no back-pointers from items to their pallet.
#[derive(Debug, Clone)]
pub struct Pallet {
    pub id: usize,
    pub spec: PalletSpec,
    items: Vec<PlacedItem>,
    eps: EpSet,
}

impl Pallet {
    /// Fresh empty pallet with a single extreme point at the origin.
    pub fn new(id: usize, spec: PalletSpec) -> Self {
        let mut eps = EpSet::new([spec.length, spec.width, spec.max_height]);
        eps.insert(0.0, 0.0, 0.0);
        Self {
            id,
            spec,
            items: Vec::new(),
            eps,
        }
    }

    /// Pallet reconstructed around already-placed items. Extreme points are
    /// seeded with the top-face vertices of each item.
    pub fn from_items(id: usize, spec: PalletSpec, items: Vec<PlacedItem>) -> Self {
        let mut eps = EpSet::new([spec.length, spec.width, spec.max_height]);
        eps.insert(0.0, 0.0, 0.0);
        for it in &items {
            let b = it.aabb();
            let z = b.max[2];
            eps.insert(b.min[0], b.min[1], z);
            eps.insert(b.max[0], b.min[1], z);
            eps.insert(b.min[0], b.max[1], z);
            eps.insert(b.max[0], b.max[1], z);
        }
        eps.sort();
        Self {
            id,
            spec,
            items,
            eps,
        }
    }

    pub fn items(&self) -> &[PlacedItem] {
        &self.items
    }

    pub fn eps(&self) -> &EpSet {
        &self.eps
    }

    pub(crate) fn eps_mut(&mut self) -> &mut EpSet {
        &mut self.eps
    }

    pub(crate) fn push_item(&mut self, item: PlacedItem) {
        self.items.push(item);
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn used_volume(&self) -> f64 {
        self.items.iter().map(|it| it.item.volume()).sum()
    }

    pub fn total_weight(&self) -> f64 {
        self.items.iter().map(|it| it.item.weight).sum()
    }

    /// Highest top face, or 0 for an empty pallet.
    pub fn top_height(&self) -> f64 {
        self.items.iter().map(|it| it.top()).fold(0.0, f64::max)
    }

    pub fn volume_utilization(&self) -> f64 {
        self.used_volume() / self.spec.volume()
    }

    pub fn height_utilization(&self) -> f64 {
        self.top_height() / self.spec.max_height
    }

    /// Number of distinct product ids on the pallet.
    pub fn distinct_products(&self) -> usize {
        let mut ids: Vec<&str> = self.items.iter().map(|it| it.item.product_id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }

    /// Distinct product ids with per-product item counts, sorted by id.
    pub fn product_counts(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for it in &self.items {
            match counts.iter_mut().find(|(p, _)| p == &it.item.product_id) {
                Some((_, n)) => *n += 1,
                None => counts.push((it.item.product_id.clone(), 1)),
            }
        }
        counts.sort_by(|a, b| a.0.cmp(&b.0));
        counts
    }

    /// Weight-weighted center of mass; pallet center when empty.
    pub fn center_of_mass(&self) -> [f64; 3] {
        weighted_center_of_mass(
            self.items.iter().map(|it| (it.aabb(), it.item.weight)),
            self.spec.center(),
        )
    }

    /// Center of mass as if `candidate` were already committed. Pure; used
    /// by the stability check without touching pallet state.
    pub fn center_of_mass_with(&self, candidate: &PlacedItem) -> [f64; 3] {
        weighted_center_of_mass(
            self.items
                .iter()
                .map(|it| (it.aabb(), it.item.weight))
                .chain(std::iter::once((candidate.aabb(), candidate.item.weight))),
            self.spec.center(),
        )
    }

    /// Distinct products divided by the order's distinct-product count.
    pub fn heterogeneity(&self, order_product_count: usize) -> f64 {
        if order_product_count == 0 {
            return 0.0;
        }
        self.distinct_products() as f64 / order_product_count as f64
    }

    /// Contact ratio of one item: floor and item-item contact area divided
    /// by the item's full surface area.
    pub fn contact_ratio(&self, index: usize) -> f64 {
        let subject = &self.items[index];
        let sb = subject.aabb();
        let mut contact = 0.0f64;

        // Bottom face: the pallet floor, or every item whose top is flush
        // with the subject's bottom.
        if subject.placement.z <= EPSILON {
            contact += subject.base_area();
        } else {
            for other in &self.items {
                if (subject.placement.z - other.top()).abs() < EPSILON {
                    contact += sb.footprint_overlap(&other.aabb());
                }
            }
        }

        // Side faces: flush X faces contribute YZ overlap, flush Y faces XZ.
        for (j, other) in self.items.iter().enumerate() {
            if j == index {
                continue;
            }
            let ob = other.aabb();
            let yz = crate::geometry::overlap_len(sb.min[1], sb.max[1], ob.min[1], ob.max[1])
                * crate::geometry::overlap_len(sb.min[2], sb.max[2], ob.min[2], ob.max[2]);
            if (sb.max[0] - ob.min[0]).abs() < EPSILON || (ob.max[0] - sb.min[0]).abs() < EPSILON {
                contact += yz;
            }
            let xz = crate::geometry::overlap_len(sb.min[0], sb.max[0], ob.min[0], ob.max[0])
                * crate::geometry::overlap_len(sb.min[2], sb.max[2], ob.min[2], ob.max[2]);
            if (sb.max[1] - ob.min[1]).abs() < EPSILON || (ob.max[1] - sb.min[1]).abs() < EPSILON {
                contact += xz;
            }
        }

        contact / subject.surface_area()
    }

    /// Mean contact ratio over the pallet's items; 0 when empty.
    pub fn compactness(&self) -> f64 {
        if self.items.is_empty() {
            return 0.0;
        }
        let sum: f64 = (0..self.items.len()).map(|i| self.contact_ratio(i)).sum();
        sum / self.items.len() as f64
    }
}

/// Discrete complexity class derived from normalized order entropy
/// (five equal-width intervals).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ComplexityClass {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl ComplexityClass {
    pub fn from_entropy(h: f64) -> Self {
        match h {
            h if h < 0.2 => Self::VeryLow,
            h if h < 0.4 => Self::Low,
            h if h < 0.6 => Self::Medium,
            h if h < 0.8 => Self::High,
            _ => Self::VeryHigh,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VeryLow => "VeryLow",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::VeryHigh => "VeryHigh",
        }
    }
}

/// Order size class by total item count.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SizeClass {
    Small,
    Medium,
    Large,
}

impl SizeClass {
    pub fn from_item_count(n: usize) -> Self {
        if n < 600 {
            Self::Small
        } else if n < 1300 {
            Self::Medium
        } else {
            Self::Large
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Small => "Small",
            Self::Medium => "Medium",
            Self::Large => "Large",
        }
    }
}

/// A customer order: a multiset of items to palletize together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub items: Vec<Item>,
}

impl Order {
    /// Builds an order, rejecting items with non-positive extents or weight.
    pub fn try_new(order_id: impl Into<String>, items: Vec<Item>) -> crate::error::Result<Self> {
        let order_id = order_id.into();
        for it in &items {
            let ok = [it.length, it.width, it.height, it.weight]
                .iter()
                .all(|v| v.is_finite() && *v > 0.0);
            if !ok {
                return Err(crate::error::PalletPackerError::InvalidInput(format!(
                    "order {}: item {} ({}) has non-positive dimensions or weight",
                    order_id, it.item_id, it.product_id
                )));
            }
        }
        Ok(Self { order_id, items })
    }

    /// Distinct product ids, sorted lexicographically for determinism.
    pub fn distinct_products(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.items.iter().map(|it| it.product_id.clone()).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Shannon entropy of the product-count distribution, normalized to
    /// [0, 1] by log2(K). Zero when the order has at most one product.
    pub fn entropy(&self) -> f64 {
        let products = self.distinct_products();
        let k = products.len();
        if k <= 1 || self.items.is_empty() {
            return 0.0;
        }
        let n = self.items.len() as f64;
        let mut h = 0.0;
        for p in &products {
            let count = self
                .items
                .iter()
                .filter(|it| &it.product_id == p)
                .count() as f64;
            let frac = count / n;
            h -= frac * frac.log2();
        }
        h / (k as f64).log2()
    }

    pub fn complexity_class(&self) -> ComplexityClass {
        ComplexityClass::from_entropy(self.entropy())
    }

    pub fn size_class(&self) -> SizeClass {
        SizeClass::from_item_count(self.items.len())
    }
}

/// Committed result for one order: the pallets that were built and the items
/// that could not be placed within the pallet budget.
#[derive(Debug, Clone)]
pub struct OrderSolution {
    pub order_id: String,
    pub algorithm: String,
    /// Total items in the order (placed + unplaced).
    pub item_count: usize,
    /// Distinct products in the order (K).
    pub product_types: usize,
    pub entropy: f64,
    pub complexity: ComplexityClass,
    pub pallets: Vec<Pallet>,
    pub unplaced: Vec<Item>,
    pub generations: usize,
    pub elapsed_ms: f64,
}

impl OrderSolution {
    pub fn items_placed(&self) -> usize {
        self.pallets.iter().map(Pallet::item_count).sum()
    }

    /// Aggregate metrics for the summary report.
    pub fn stats(&self) -> OrderStats {
        let used = self.pallets.len();
        let mean = |f: &dyn Fn(&Pallet) -> f64| -> f64 {
            if used == 0 {
                0.0
            } else {
                self.pallets.iter().map(|p| f(p)).sum::<f64>() / used as f64
            }
        };
        OrderStats {
            pallets_used: used,
            items_placed: self.items_placed(),
            items_unplaced: self.unplaced.len(),
            avg_volume_utilization: mean(&Pallet::volume_utilization),
            avg_height_utilization: mean(&Pallet::height_utilization),
            total_weight: self.pallets.iter().map(Pallet::total_weight).sum(),
            avg_heterogeneity: mean(&|p: &Pallet| p.heterogeneity(self.product_types)),
            avg_compactness: mean(&Pallet::compactness),
        }
    }
}

/// Derived metrics of a committed solution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStats {
    pub pallets_used: usize,
    pub items_placed: usize,
    pub items_unplaced: usize,
    pub avg_volume_utilization: f64,
    pub avg_height_utilization: f64,
    pub total_weight: f64,
    pub avg_heterogeneity: f64,
    pub avg_compactness: f64,
}
