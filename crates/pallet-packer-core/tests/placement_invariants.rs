use pallet_packer_core::config::PackerConfig;
use pallet_packer_core::constraints;
use pallet_packer_core::geometry::EPSILON;
use pallet_packer_core::model::{Item, Pallet, PalletSpec};
use pallet_packer_core::packer::extreme_point::EpPlacer;

fn assert_pallet_invariants(pallet: &Pallet) {
    let items = pallet.items();
    for (i, it) in items.iter().enumerate() {
        let b = it.aabb();
        assert!(
            b.max[0] <= pallet.spec.length + EPSILON
                && b.max[1] <= pallet.spec.width + EPSILON
                && b.max[2] <= pallet.spec.max_height + EPSILON,
            "item {} out of bounds",
            it.item.item_id
        );
        for other in &items[i + 1..] {
            assert!(
                !b.overlaps(&other.aabb()),
                "items {} and {} overlap",
                it.item.item_id,
                other.item.item_id
            );
        }
    }
    // Support coherence: every airborne item satisfies the support rule
    // against the other placed items.
    for it in items {
        if it.placement.z > EPSILON {
            assert!(
                constraints::is_supported(it, pallet),
                "item {} is unsupported at z {}",
                it.item.item_id,
                it.placement.z
            );
        }
    }
}

#[test]
fn single_item_lands_at_origin() {
    // Pallet 1200x800x1400, one 100x80x150 item.
    let cfg = PackerConfig::default();
    let placer = EpPlacer::new(&cfg);
    let mut pallet = Pallet::new(1, PalletSpec::default());

    let p = placer
        .try_place(&mut pallet, &Item::new("p1", 1, 100.0, 80.0, 150.0, 1.0))
        .expect("single small item must fit");
    assert_eq!((p.x, p.y, p.z), (0.0, 0.0, 0.0));
    assert!(!p.rotated);

    let expected_vol = (100.0 * 80.0 * 150.0) / (1200.0 * 800.0 * 1400.0);
    assert!((pallet.volume_utilization() - expected_vol).abs() < 1e-12);
    assert_pallet_invariants(&pallet);
}

#[test]
fn three_items_fill_the_floor_of_one_pallet() {
    let cfg = PackerConfig::default();
    let placer = EpPlacer::new(&cfg);
    let mut pallet = Pallet::new(1, PalletSpec::default());

    let items = [
        Item::new("a", 1, 300.0, 200.0, 150.0, 2.0),
        Item::new("b", 2, 250.0, 180.0, 120.0, 1.5),
        Item::new("c", 3, 200.0, 150.0, 100.0, 1.0),
    ];
    for it in &items {
        placer.try_place(&mut pallet, it).expect("must fit");
    }

    assert_eq!(pallet.item_count(), 3);
    for it in pallet.items() {
        assert_eq!(it.placement.z, 0.0);
    }
    let first = &pallet.items()[0];
    assert_eq!((first.placement.x, first.placement.y), (0.0, 0.0));
    assert_pallet_invariants(&pallet);
}

#[test]
fn seeded_stream_of_items_respects_invariants() {
    use rand::{Rng, SeedableRng};
    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    let cfg = PackerConfig::default();
    let placer = EpPlacer::new(&cfg);
    let mut pallet = Pallet::new(1, PalletSpec::default());

    let mut placed = 0;
    for i in 0..40 {
        let item = Item::new(
            format!("p{}", i % 4),
            i,
            rng.gen_range(200.0..450.0),
            rng.gen_range(180.0..350.0),
            rng.gen_range(120.0..260.0),
            rng.gen_range(0.5..8.0),
        );
        if placer.try_place(&mut pallet, &item).is_some() {
            placed += 1;
        }
        assert_pallet_invariants(&pallet);
    }
    assert!(placed >= 4, "expected a handful of placements, got {placed}");
    assert_eq!(pallet.item_count(), placed);
}

#[test]
fn placer_is_repeatable() {
    use rand::{Rng, SeedableRng};
    let cfg = PackerConfig::default();

    let run = || {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let placer = EpPlacer::new(&cfg);
        let mut pallet = Pallet::new(1, PalletSpec::default());
        for i in 0..25 {
            let item = Item::new(
                "p",
                i,
                rng.gen_range(200.0..400.0),
                rng.gen_range(180.0..320.0),
                rng.gen_range(120.0..240.0),
                1.0,
            );
            let _ = placer.try_place(&mut pallet, &item);
        }
        pallet
            .items()
            .iter()
            .map(|it| (it.item.item_id, it.placement))
            .collect::<Vec<_>>()
    };

    assert_eq!(run(), run());
}

#[test]
fn stacking_respects_the_support_rule() {
    let cfg = PackerConfig::default();
    let placer = EpPlacer::new(&cfg);
    let mut pallet = Pallet::new(1, PalletSpec::default());

    // Same-height bases create a flush platform at z = 200; the stacked item
    // must land on it, never float.
    for i in 0..4 {
        placer
            .try_place(&mut pallet, &Item::new("base", i, 400.0, 300.0, 200.0, 3.0))
            .expect("base layer fits");
    }
    for i in 4..8 {
        placer
            .try_place(&mut pallet, &Item::new("top", i, 350.0, 280.0, 180.0, 2.0))
            .expect("second wave fits");
    }
    assert_pallet_invariants(&pallet);
}
