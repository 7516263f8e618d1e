use crate::config::PackerConfig;
use crate::ga::individual::Fitness;
use crate::ga::seeds::ProductSummary;
use crate::model::{Item, Order, Pallet, PalletSpec};
use crate::packer::extreme_point::EpPlacer;

/// Result of decoding one product ordering against a pallet budget.
///
/// `pallets` holds the pallets actually opened (in order) when the ordering
/// is valid; an invalid ordering carries no pallets.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub valid: bool,
    pub fitness: Fitness,
    pub pallets: Vec<Pallet>,
}

/// Sentinel scores for orderings that exceed the pallet budget. Never
/// compared or crowded; invalid individuals go to the terminal front.
pub const WORST_FITNESS: Fitness = Fitness {
    het: f64::MAX,
    comp: f64::MIN,
    vol: f64::MIN,
};

/// Groups an order's items per product index, preserving input order within
/// each product.
pub fn group_items(order: &Order, products: &[ProductSummary]) -> Vec<Vec<Item>> {
    products
        .iter()
        .map(|p| {
            order
                .items
                .iter()
                .filter(|it| it.product_id == p.product_id)
                .cloned()
                .collect()
        })
        .collect()
}

/// Applies a product ordering to a fresh stack of pallets and scores the
/// result. Deterministic: identical inputs yield identical placements.
#[derive(Debug)]
pub struct Evaluator<'a> {
    cfg: &'a PackerConfig,
    groups: &'a [Vec<Item>],
    /// Distinct products in the order (K); heterogeneity denominator.
    product_count: usize,
    /// Pallet budget for the order.
    budget: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(cfg: &'a PackerConfig, groups: &'a [Vec<Item>], budget: usize) -> Self {
        Self {
            cfg,
            groups,
            product_count: groups.len(),
            budget,
        }
    }

    /// Places every item, product by product in gene order, advancing to a
    /// fresh pallet when the current one rejects an item. The cursor never
    /// returns to earlier pallets.
    pub fn evaluate(&self, genes: &[usize]) -> Evaluation {
        let spec = PalletSpec::from_config(self.cfg);
        let placer = EpPlacer::new(self.cfg);
        let mut pallets = vec![Pallet::new(1, spec)];
        let mut cursor = 0usize;

        for &gene in genes {
            for item in &self.groups[gene] {
                loop {
                    if placer.try_place(&mut pallets[cursor], item).is_some() {
                        break;
                    }
                    if pallets.len() >= self.budget {
                        return Evaluation {
                            valid: false,
                            fitness: WORST_FITNESS,
                            pallets: Vec::new(),
                        };
                    }
                    cursor += 1;
                    pallets.push(Pallet::new(cursor + 1, spec));
                }
            }
        }

        let fitness = self.score(&pallets);
        Evaluation {
            valid: true,
            fitness,
            pallets,
        }
    }

    fn score(&self, pallets: &[Pallet]) -> Fitness {
        let n = pallets.len() as f64;
        let het = pallets
            .iter()
            .map(|p| p.heterogeneity(self.product_count))
            .sum::<f64>()
            / n;
        let comp = pallets.iter().map(Pallet::compactness).sum::<f64>() / n;
        let vol = pallets.iter().map(Pallet::volume_utilization).sum::<f64>() / n;
        Fitness { het, comp, vol }
    }
}
