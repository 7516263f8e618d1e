use crate::model::Order;

/// Per-product aggregates used by the seed orderings.
#[derive(Debug, Clone)]
pub struct ProductSummary {
    pub product_id: String,
    pub count: usize,
    pub mean_weight: f64,
    pub mean_base_area: f64,
    pub mean_volume: f64,
    pub total_volume: f64,
}

/// Summarizes an order's product types, sorted lexicographically by id.
/// Gene values index into this table.
pub fn summarize_products(order: &Order) -> Vec<ProductSummary> {
    let ids = order.distinct_products();
    ids.into_iter()
        .map(|product_id| {
            let items: Vec<_> = order
                .items
                .iter()
                .filter(|it| it.product_id == product_id)
                .collect();
            let n = items.len() as f64;
            ProductSummary {
                count: items.len(),
                mean_weight: items.iter().map(|it| it.weight).sum::<f64>() / n,
                mean_base_area: items.iter().map(|it| it.base_area()).sum::<f64>() / n,
                mean_volume: items.iter().map(|it| it.volume()).sum::<f64>() / n,
                total_volume: items.iter().map(|it| it.volume()).sum::<f64>(),
                product_id,
            }
        })
        .collect()
}

/// Ten deterministic heuristic permutations: each of {mean weight, count,
/// mean base area, mean volume, total volume} sorted ascending and
/// descending, ties broken by product id.
pub fn seed_orderings(products: &[ProductSummary]) -> Vec<Vec<usize>> {
    let metrics: [fn(&ProductSummary) -> f64; 5] = [
        |p| p.mean_weight,
        |p| p.count as f64,
        |p| p.mean_base_area,
        |p| p.mean_volume,
        |p| p.total_volume,
    ];

    let mut seeds = Vec::with_capacity(10);
    for metric in metrics {
        for descending in [false, true] {
            let mut perm: Vec<usize> = (0..products.len()).collect();
            perm.sort_by(|&a, &b| {
                let (ma, mb) = (metric(&products[a]), metric(&products[b]));
                let ord = if descending {
                    mb.total_cmp(&ma)
                } else {
                    ma.total_cmp(&mb)
                };
                ord.then_with(|| products[a].product_id.cmp(&products[b].product_id))
            });
            seeds.push(perm);
        }
    }
    seeds
}
