use super::*;

fn outbox() -> (Outbox, mpsc::Receiver<Arc<ServerEvent>>) {
    mpsc::channel(8)
}

// =============================================================================
// color_for
// =============================================================================

#[test]
fn color_for_is_deterministic() {
    let id = Uuid::new_v4().to_string();
    assert_eq!(color_for(&id), color_for(&id));
}

#[test]
fn color_for_sums_code_points_into_palette() {
    // 'a' = 97, 97 % 10 = 7
    assert_eq!(color_for("a"), PALETTE[7]);
    // "ab" = 97 + 98 = 195, 195 % 10 = 5
    assert_eq!(color_for("ab"), PALETTE[5]);
    assert_eq!(color_for(""), PALETTE[0]);
}

#[test]
fn color_for_always_lands_in_palette() {
    for _ in 0..50 {
        let id = Uuid::new_v4().to_string();
        assert!(PALETTE.contains(&color_for(&id)));
    }
}

// =============================================================================
// register / resolve / unregister
// =============================================================================

#[test]
fn first_registration_is_fresh_and_later_ones_are_not() {
    let mut registry = SessionRegistry::new();
    let (tx_a, _rx_a) = outbox();
    let (tx_b, _rx_b) = outbox();

    let a = registry.register(Uuid::new_v4(), None, tx_a);
    let b = registry.register(Uuid::new_v4(), None, tx_b);

    assert!(a.fresh);
    assert!(!b.fresh);
    assert_eq!(registry.len(), 2);
}

#[test]
fn registration_becomes_fresh_again_after_everyone_leaves() {
    let mut registry = SessionRegistry::new();
    let id = Uuid::new_v4();
    let (tx, _rx) = outbox();
    registry.register(id, None, tx);
    registry.unregister(id);

    let (tx, _rx) = outbox();
    assert!(registry.register(Uuid::new_v4(), None, tx).fresh);
}

#[test]
fn register_assigns_color_from_id() {
    let mut registry = SessionRegistry::new();
    let id = Uuid::new_v4();
    let (tx, _rx) = outbox();

    let reg = registry.register(id, Some("ada"), tx);

    assert_eq!(reg.participant.color, color_for(&id.to_string()));
    assert_eq!(registry.resolve(id), Some(&reg.participant));
}

#[test]
fn display_name_defaults_to_id_prefix() {
    let id = Uuid::new_v4();
    let expected: String = id.to_string().chars().take(6).collect();
    assert_eq!(display_name(id, None), expected);
    assert_eq!(display_name(id, Some("   ")), expected);
}

#[test]
fn display_name_is_trimmed_and_bounded() {
    let id = Uuid::new_v4();
    assert_eq!(display_name(id, Some("  ada  ")), "ada");
    let long = "x".repeat(100);
    assert_eq!(display_name(id, Some(&long)).chars().count(), MAX_NAME_CHARS);
}

#[test]
fn unregister_unknown_id_is_a_no_op() {
    let mut registry = SessionRegistry::new();
    let (tx, _rx) = outbox();
    let known = Uuid::new_v4();
    registry.register(known, None, tx);

    assert!(registry.unregister(Uuid::new_v4()).is_none());
    assert!(registry.unregister(known).is_some());
    assert!(registry.unregister(known).is_none());
    assert!(registry.is_empty());
    assert_eq!(registry.clients().count(), 0);
}

#[test]
fn others_excludes_the_given_participant() {
    let mut registry = SessionRegistry::new();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let (tx_a, _rx_a) = outbox();
    let (tx_b, _rx_b) = outbox();
    registry.register(a, None, tx_a);
    registry.register(b, None, tx_b);

    let others: Vec<Uuid> = registry.others(a).map(|p| p.id).collect();
    assert_eq!(others, vec![b]);
}

#[test]
fn detach_drops_outbox_but_keeps_presence() {
    let mut registry = SessionRegistry::new();
    let id = Uuid::new_v4();
    let (tx, mut rx) = outbox();
    registry.register(id, None, tx);

    assert!(registry.detach(id).is_some());
    assert!(registry.detach(id).is_none());
    assert_eq!(registry.clients().count(), 0);
    assert!(registry.resolve(id).is_some());
    assert!(rx.try_recv().is_err());
    assert!(registry.unregister(id).is_some());
}
