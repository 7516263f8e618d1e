use criterion::{criterion_group, criterion_main, Criterion};
use rand::{Rng, SeedableRng};

use pallet_packer_core::config::PackerConfig;
use pallet_packer_core::model::{Item, Order, Pallet, PalletSpec};
use pallet_packer_core::packer::extreme_point::EpPlacer;
use pallet_packer_core::pipeline::pack_order;

fn synthetic_order(items: usize, products: usize, seed: u64) -> Order {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let items = (0..items)
        .map(|i| {
            Item::new(
                format!("p{}", i % products),
                i as u32,
                rng.gen_range(220.0..420.0),
                rng.gen_range(180.0..340.0),
                rng.gen_range(130.0..250.0),
                rng.gen_range(0.5..6.0),
            )
        })
        .collect();
    Order::try_new("bench", items).unwrap()
}

fn bench_placer(c: &mut Criterion) {
    let order = synthetic_order(60, 4, 42);
    c.bench_function("ep_placer_60_items", |b| {
        b.iter(|| {
            let cfg = PackerConfig::default();
            let placer = EpPlacer::new(&cfg);
            let mut pallets = vec![Pallet::new(1, PalletSpec::default())];
            for item in &order.items {
                loop {
                    let last = pallets.len() - 1;
                    if placer.try_place(&mut pallets[last], item).is_some() {
                        break;
                    }
                    if pallets.len() >= 5 {
                        break;
                    }
                    pallets.push(Pallet::new(pallets.len() + 1, PalletSpec::default()));
                }
            }
            pallets
        })
    });
}

fn bench_search(c: &mut Criterion) {
    let order = synthetic_order(30, 3, 42);
    let cfg = PackerConfig::builder()
        .population_size(30)
        .offspring(10)
        .max_generations(5)
        .build();
    c.bench_function("search_30_items_short", |b| {
        b.iter(|| pack_order(&order, &cfg, 42).unwrap())
    });
}

criterion_group!(benches, bench_placer, bench_search);
criterion_main!(benches);
