use instinct_core::{Commons, PackSignals, Vec3};

#[test]
fn orders_expire_on_the_simulation_clock() {
    let mut board = PackSignals::new();
    board.post_attack(3, Vec3::new(4.0, 0.0, 2.0), 10.0, 2.5);

    assert_eq!(board.attack_target(3, 11.0), Some(Vec3::new(4.0, 0.0, 2.0)));
    assert_eq!(board.attack_target(3, 12.5), None);
    assert_eq!(board.attack_target(4, 11.0), None);
}

#[test]
fn move_orders_are_flattened_and_independent_of_attacks() {
    let mut board = PackSignals::new();
    board.post_move(1, Vec3::new(3.0, 5.0, 0.0), 0.0, 1.0);
    board.post_attack(1, Vec3::new(1.0, 0.0, 1.0), 0.0, 4.0);

    assert_eq!(board.move_direction(1, 0.5), Some(Vec3::new(1.0, 0.0, 0.0)));
    board.stand_down(1);
    assert_eq!(board.attack_target(1, 0.5), None);
    assert_eq!(board.move_direction(1, 0.5), Some(Vec3::new(1.0, 0.0, 0.0)));
    assert_eq!(board.move_direction(1, 1.5), None);
}

#[test]
fn degenerate_orders_are_ignored() {
    let mut board = PackSignals::new();
    board.post_attack(1, Vec3::UNKNOWN, 0.0, 3.0);
    board.post_attack(1, Vec3::ZERO, 0.0, 0.0);
    board.post_move(1, Vec3::UP, 0.0, 3.0);
    assert!(board.is_empty());
}

#[test]
fn expired_packs_are_pruned_when_new_orders_arrive() {
    let mut board = PackSignals::new();
    board.post_attack(1, Vec3::ZERO, 0.0, 1.0);
    board.post_attack(2, Vec3::ZERO, 5.0, 1.0);
    assert_eq!(board.len(), 1);
}

#[test]
fn commons_start_with_an_empty_board() {
    assert!(Commons::default().packs.is_empty());
}
