//! Row shaping for the CSV reports. Building the rows lives here; writing
//! files is the CLI's job.

use serde::Serialize;

use crate::batch::stable_hash;
use crate::model::{OrderSolution, Pallet};

/// One summary row per order, appended across a batch.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRow {
    #[serde(rename = "OrderId")]
    pub order_id: String,
    #[serde(rename = "Algorithm")]
    pub algorithm: String,
    #[serde(rename = "ItemCount")]
    pub item_count: usize,
    #[serde(rename = "ProductTypes")]
    pub product_types: usize,
    #[serde(rename = "Entropy")]
    pub entropy: String,
    #[serde(rename = "Complexity")]
    pub complexity: String,
    #[serde(rename = "PalletsUsed")]
    pub pallets_used: usize,
    #[serde(rename = "ItemsPlaced")]
    pub items_placed: usize,
    #[serde(rename = "ItemsUnplaced")]
    pub items_unplaced: usize,
    #[serde(rename = "AvgVolumeUtilization")]
    pub avg_volume_utilization: String,
    #[serde(rename = "AvgHeightUtilization")]
    pub avg_height_utilization: String,
    #[serde(rename = "TotalWeight")]
    pub total_weight: String,
    #[serde(rename = "AvgHeterogeneity")]
    pub avg_heterogeneity: String,
    #[serde(rename = "AvgCompactness")]
    pub avg_compactness: String,
    #[serde(rename = "ExecutionTimeMs")]
    pub execution_time_ms: String,
}

/// One row per pallet in the per-order detail report.
#[derive(Debug, Clone, Serialize)]
pub struct PalletRow {
    #[serde(rename = "OrderId")]
    pub order_id: String,
    #[serde(rename = "PalletId")]
    pub pallet_id: usize,
    #[serde(rename = "ItemCount")]
    pub item_count: usize,
    #[serde(rename = "ProductTypes")]
    pub product_types: usize,
    #[serde(rename = "VolumeUtilization")]
    pub volume_utilization: String,
    #[serde(rename = "HeightUtilization")]
    pub height_utilization: String,
    #[serde(rename = "Weight")]
    pub weight: String,
    #[serde(rename = "Heterogeneity")]
    pub heterogeneity: String,
    #[serde(rename = "Compactness")]
    pub compactness: String,
    /// `pid(count);pid(count);…` over the pallet's products.
    #[serde(rename = "Products")]
    pub products: String,
}

/// One row per placed item in the per-order placements report.
#[derive(Debug, Clone, Serialize)]
pub struct PlacementRow {
    #[serde(rename = "OrderId")]
    pub order_id: String,
    #[serde(rename = "PalletId")]
    pub pallet_id: usize,
    #[serde(rename = "ItemId")]
    pub item_id: u32,
    #[serde(rename = "ProductId")]
    pub product_id: String,
    #[serde(rename = "X")]
    pub x: f64,
    #[serde(rename = "Y")]
    pub y: f64,
    #[serde(rename = "Z")]
    pub z: f64,
    #[serde(rename = "Length")]
    pub length: f64,
    #[serde(rename = "Width")]
    pub width: f64,
    #[serde(rename = "Height")]
    pub height: f64,
    #[serde(rename = "Weight")]
    pub weight: f64,
    #[serde(rename = "IsRotated")]
    pub is_rotated: bool,
    #[serde(rename = "PalletLength")]
    pub pallet_length: f64,
    #[serde(rename = "PalletWidth")]
    pub pallet_width: f64,
    #[serde(rename = "PalletMaxHeight")]
    pub pallet_max_height: f64,
    /// `#RRGGBB` for the visualizer, stable per product id.
    #[serde(rename = "Color")]
    pub color: String,
}

/// Two decimal places.
pub fn fmt2(v: f64) -> String {
    format!("{v:.2}")
}

/// Four decimal places.
pub fn fmt4(v: f64) -> String {
    format!("{v:.4}")
}

pub fn summary_row(solution: &OrderSolution) -> SummaryRow {
    let stats = solution.stats();
    SummaryRow {
        order_id: solution.order_id.clone(),
        algorithm: solution.algorithm.clone(),
        item_count: solution.item_count,
        product_types: solution.product_types,
        entropy: fmt4(solution.entropy),
        complexity: solution.complexity.as_str().to_string(),
        pallets_used: stats.pallets_used,
        items_placed: stats.items_placed,
        items_unplaced: stats.items_unplaced,
        avg_volume_utilization: fmt4(stats.avg_volume_utilization),
        avg_height_utilization: fmt4(stats.avg_height_utilization),
        total_weight: fmt2(stats.total_weight),
        avg_heterogeneity: fmt4(stats.avg_heterogeneity),
        avg_compactness: fmt4(stats.avg_compactness),
        execution_time_ms: fmt2(solution.elapsed_ms),
    }
}

pub fn pallet_rows(solution: &OrderSolution) -> Vec<PalletRow> {
    solution
        .pallets
        .iter()
        .map(|p| PalletRow {
            order_id: solution.order_id.clone(),
            pallet_id: p.id,
            item_count: p.item_count(),
            product_types: p.distinct_products(),
            volume_utilization: fmt4(p.volume_utilization()),
            height_utilization: fmt4(p.height_utilization()),
            weight: fmt2(p.total_weight()),
            heterogeneity: fmt4(p.heterogeneity(solution.product_types)),
            compactness: fmt4(p.compactness()),
            products: product_list(p),
        })
        .collect()
}

pub fn placement_rows(solution: &OrderSolution) -> Vec<PlacementRow> {
    solution
        .pallets
        .iter()
        .flat_map(|p| {
            p.items().iter().map(move |it| PlacementRow {
                order_id: solution.order_id.clone(),
                pallet_id: p.id,
                item_id: it.item.item_id,
                product_id: it.item.product_id.clone(),
                x: it.placement.x,
                y: it.placement.y,
                z: it.placement.z,
                length: it.item.length,
                width: it.item.width,
                height: it.item.height,
                weight: it.item.weight,
                is_rotated: it.placement.rotated,
                pallet_length: p.spec.length,
                pallet_width: p.spec.width,
                pallet_max_height: p.spec.max_height,
                color: product_color(&it.item.product_id),
            })
        })
        .collect()
}

fn product_list(pallet: &Pallet) -> String {
    pallet
        .product_counts()
        .into_iter()
        .map(|(pid, n)| format!("{pid}({n})"))
        .collect::<Vec<_>>()
        .join(";")
}

/// Stable display color for a product: golden-angle hue spacing seeded by a
/// hash of the product id, via HSL → RGB.
pub fn product_color(product_id: &str) -> String {
    let hue = (stable_hash(product_id) as f64 * 137.507_764) % 360.0;
    let (r, g, b) = hsl_to_rgb(hue, 0.65, 0.55);
    format!("#{r:02X}{g:02X}{b:02X}")
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = h / 60.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r1, g1, b1) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    (
        ((r1 + m) * 255.0).round() as u8,
        ((g1 + m) * 255.0).round() as u8,
        ((b1 + m) * 255.0).round() as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Item, Pallet, PalletSpec, PlacedItem, Placement};

    fn solution_with_one_item() -> OrderSolution {
        let placed = PlacedItem {
            item: Item::new("p1", 1, 100.0, 80.0, 150.0, 1.25),
            placement: Placement {
                x: 0.0,
                y: 0.0,
                z: 0.0,
                rotated: false,
            },
        };
        OrderSolution {
            order_id: "o1".into(),
            algorithm: "ep-nsga2".into(),
            item_count: 1,
            product_types: 1,
            entropy: 0.0,
            complexity: crate::model::ComplexityClass::VeryLow,
            pallets: vec![Pallet::from_items(1, PalletSpec::default(), vec![placed])],
            unplaced: Vec::new(),
            generations: 1,
            elapsed_ms: 12.345,
        }
    }

    #[test]
    fn summary_row_formats_floats() {
        let row = summary_row(&solution_with_one_item());
        assert_eq!(row.entropy, "0.0000");
        assert_eq!(row.total_weight, "1.25");
        assert_eq!(row.execution_time_ms, "12.35");
        assert_eq!(row.items_placed, 1);
        assert_eq!(row.items_unplaced, 0);
    }

    #[test]
    fn placement_rows_carry_pallet_extents() {
        let rows = placement_rows(&solution_with_one_item());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].pallet_length, 1200.0);
        assert_eq!(rows[0].pallet_width, 800.0);
        assert_eq!(rows[0].pallet_max_height, 1400.0);
        assert!(!rows[0].is_rotated);
    }

    #[test]
    fn product_colors_are_stable_and_well_formed() {
        let a = product_color("93215");
        let b = product_color("93215");
        assert_eq!(a, b);
        assert_eq!(a.len(), 7);
        assert!(a.starts_with('#'));
        assert_ne!(product_color("93215"), product_color("93216"));
    }

    #[test]
    fn product_list_is_sorted_and_counted() {
        let items = vec![
            PlacedItem {
                item: Item::new("b", 1, 100.0, 100.0, 100.0, 1.0),
                placement: Placement {
                    x: 0.0,
                    y: 0.0,
                    z: 0.0,
                    rotated: false,
                },
            },
            PlacedItem {
                item: Item::new("a", 2, 100.0, 100.0, 100.0, 1.0),
                placement: Placement {
                    x: 100.0,
                    y: 0.0,
                    z: 0.0,
                    rotated: false,
                },
            },
            PlacedItem {
                item: Item::new("b", 3, 100.0, 100.0, 100.0, 1.0),
                placement: Placement {
                    x: 200.0,
                    y: 0.0,
                    z: 0.0,
                    rotated: false,
                },
            },
        ];
        let pallet = Pallet::from_items(1, PalletSpec::default(), items);
        assert_eq!(product_list(&pallet), "a(1);b(2)");
    }
}
