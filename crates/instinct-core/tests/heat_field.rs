use instinct_core::{AnchorCache, Commons, HeatField, HeatFieldConfig, TargetId, Vec3};
use proptest::prelude::*;

const STRIKE_THRESHOLD: f32 = 6.0;

#[test]
fn footstep_then_item_drop_two_seconds_apart() {
    let mut field = HeatField::default();
    let spot = Vec3::new(3.0, 0.0, 3.0);

    field.register_footstep(spot);
    assert_eq!(field.heat_at(spot), 1.0);

    // 1.0 - 2.0 * 1.2 < 0: the footstep is gone before the item drops.
    field.decay(2.0);
    assert!(field.hottest().is_none());

    field.register_item_drop(spot);
    assert_eq!(field.heat_at(spot), 5.0);
    assert_eq!(field.seconds_until_below(spot, STRIKE_THRESHOLD), 0.0);
}

#[test]
fn item_drop_then_footstep_time_until_below_threshold() {
    let mut field = HeatField::default();
    let spot = Vec3::new(3.0, 0.0, 3.0);

    field.register_item_drop(spot);
    field.decay(2.0);
    field.register_footstep(spot);
    field.register_item_drop(spot);

    // 5 - 2.4 + 1 + 5 = 8.6; (8.6 - 6) / 1.2 seconds to fall under the threshold.
    let heat = field.heat_at(spot);
    assert!((heat - 8.6).abs() < 1e-4);
    let expected = (8.6 - STRIKE_THRESHOLD) / 1.2;
    let wait = field.seconds_until_below(spot, STRIKE_THRESHOLD);
    assert!((wait - expected).abs() < 1e-4);

    field.decay(wait + 1e-3);
    assert!(field.heat_at(spot) < STRIKE_THRESHOLD);
}

#[test]
fn heat_is_clamped_and_non_finite_input_ignored() {
    let mut field = HeatField::default();
    let spot = Vec3::new(-4.0, 1.0, 10.0);
    for _ in 0..20 {
        field.register_item_drop(spot);
    }
    assert_eq!(field.heat_at(spot), 40.0);

    field.add_heat(Vec3::UNKNOWN, 10.0);
    field.add_heat(spot, f32::NAN);
    field.register_burst(spot, f32::INFINITY);
    assert_eq!(field.len(), 1);
    assert_eq!(field.normalize(field.heat_at(spot)), 1.0);
}

#[test]
fn burst_has_a_minimum() {
    let mut field = HeatField::default();
    field.register_burst(Vec3::ZERO, 0.1);
    assert_eq!(field.heat_at(Vec3::ZERO), 0.5);
}

#[test]
fn negative_coordinates_floor_into_their_own_cell() {
    let field = HeatField::default();
    assert_eq!(field.cell_of(Vec3::new(-0.5, 0.0, 0.5)), (-1, 0));
    assert_eq!(field.cell_of(Vec3::new(5.99, 0.0, 6.0)), (0, 1));
}

#[test]
fn hottest_reports_cell_center() {
    let mut field = HeatField::default();
    field.register_footstep(Vec3::new(1.0, 2.0, 1.0));
    field.register_item_drop(Vec3::new(13.0, 0.0, -1.0));

    let hottest = field.hottest().expect("heat registered");
    assert_eq!(hottest.cell, (2, -1));
    assert_eq!(hottest.center, Vec3::new(15.0, 0.0, -3.0));
    assert_eq!(hottest.heat, 5.0);
}

#[test]
fn dampen_scales_nearby_cells_only() {
    let mut field = HeatField::default();
    let near = Vec3::new(3.0, 0.0, 3.0);
    let far = Vec3::new(60.0, 0.0, 60.0);
    field.register_item_drop(near);
    field.register_item_drop(far);

    field.dampen(near, 10.0);
    assert!((field.heat_at(near) - 1.0).abs() < 1e-6);
    assert_eq!(field.heat_at(far), 5.0);
}

#[test]
fn advance_decays_once_per_tick() {
    let mut commons = Commons::new(HeatFieldConfig::default(), 2.0);
    commons.heat.register_item_drop(Vec3::ZERO);
    assert!(commons.advance(1, 1.0));
    assert!(!commons.advance(1, 1.0));
    assert!((commons.heat.heat_at(Vec3::ZERO) - 3.8).abs() < 1e-5);
}

#[test]
fn missing_anchor_is_retried_after_cooldown() {
    let mut anchors = AnchorCache::new(2.0);
    let mut lookups = 0;

    let mut resolve = |anchors: &mut AnchorCache, now: f32, found: bool| {
        anchors.resolve("ship", now, |_| {
            lookups += 1;
            found.then_some(Vec3::new(5.0, 0.0, 5.0))
        })
    };

    assert_eq!(resolve(&mut anchors, 0.0, false), None);
    assert_eq!(resolve(&mut anchors, 1.0, true), None);
    assert_eq!(resolve(&mut anchors, 2.5, true), Some(Vec3::new(5.0, 0.0, 5.0)));
    assert_eq!(resolve(&mut anchors, 3.0, false), Some(Vec3::new(5.0, 0.0, 5.0)));
    drop(resolve);
    assert_eq!(lookups, 2);
}

proptest! {
    #[test]
    fn burst_fully_decays_after_magnitude_over_rate(
        magnitude in 0.5f32..40.0,
        x in -200.0f32..200.0,
        z in -200.0f32..200.0,
    ) {
        let mut field = HeatField::default();
        let spot = Vec3::new(x, 0.0, z);
        field.register_burst(spot, magnitude);
        let rate = field.config().decay_per_second;
        field.decay(magnitude / rate + 1e-3);

        prop_assert!(field.heat_at(spot) <= field.config().prune_floor);
        prop_assert!(field.hottest().is_none());
    }

    #[test]
    fn hottest_never_reports_pruned_cells(
        amounts in prop::collection::vec(0.0f32..3.0, 1..20),
        dt in 0.0f32..3.0,
    ) {
        let mut field = HeatField::default();
        for (i, amount) in amounts.iter().enumerate() {
            field.add_heat(Vec3::new(i as f32 * 7.0, 0.0, 0.0), *amount);
        }
        field.decay(dt);
        if let Some(hot) = field.hottest() {
            prop_assert!(hot.heat > field.config().prune_floor);
        }
    }
}

#[test]
fn stimulus_claim_is_granted_once_per_target_and_tick() {
    let mut commons = Commons::default();
    assert!(commons.claim_stimulus(TargetId(1), 4));
    assert!(!commons.claim_stimulus(TargetId(1), 4));
    assert!(commons.claim_stimulus(TargetId(2), 4));
    assert!(commons.claim_stimulus(TargetId(1), 5));
    assert!(!commons.claim_stimulus(TargetId(1), 3));

    commons.forget_target(TargetId(1));
    assert!(commons.claim_stimulus(TargetId(1), 3));
}
