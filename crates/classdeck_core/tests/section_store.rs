use classdeck_core::{
    Classroom, Membership, MoveRequest, OrderStore, OrderStoreError, ReorderRequest, Scope,
    SectionId, SectionRepository, ShiftDirection, ShiftEntry, SqliteOrderStore,
};
use uuid::Uuid;

fn setup() -> SqliteOrderStore {
    SqliteOrderStore::open_in_memory().unwrap()
}

fn seed_sections(store: &mut SqliteOrderStore, owner: Uuid, names: &[&str]) -> Vec<SectionId> {
    names
        .iter()
        .map(|name| {
            store
                .create_section(owner, Scope::Creation, name, None)
                .unwrap()
                .section_id
        })
        .collect()
}

fn orders(store: &SqliteOrderStore, owner: Uuid) -> Vec<(String, i64)> {
    store
        .list_sections(owner, Scope::Creation)
        .unwrap()
        .into_iter()
        .map(|section| (section.display_name, section.sort_order))
        .collect()
}

fn named(pairs: &[(&str, i64)]) -> Vec<(String, i64)> {
    pairs
        .iter()
        .map(|(name, order)| (name.to_string(), *order))
        .collect()
}

#[test]
fn create_section_appends_and_first_becomes_default() {
    let mut store = setup();
    let owner = Uuid::new_v4();
    let ids = seed_sections(&mut store, owner, &["A", "B", "C"]);

    let sections = store.list_sections(owner, Scope::Creation).unwrap();
    assert_eq!(sections.len(), 3);
    assert_eq!(sections[0].section_id, ids[0]);
    assert!(sections[0].is_default);
    assert!(!sections[1].is_default);
    assert_eq!(orders(&store, owner), named(&[("A", 1), ("B", 2), ("C", 3)]));

    // Scopes are partitioned: membership ordering starts over.
    let joined = store
        .create_section(owner, Scope::Membership, "Joined", None)
        .unwrap();
    assert_eq!(joined.sort_order, 1);
    assert!(joined.is_default);
}

#[test]
fn reorder_up_moves_active_later_and_shifts_range_down() {
    let mut store = setup();
    let owner = Uuid::new_v4();
    let ids = seed_sections(&mut store, owner, &["A", "B", "C", "D"]);

    store
        .apply_reorder(
            owner,
            &ReorderRequest {
                active_section_id: ids[1],
                over_section_id: ids[3],
                shift_set: vec![
                    ShiftEntry {
                        section_id: ids[2],
                        order: 3,
                    },
                    ShiftEntry {
                        section_id: ids[3],
                        order: 4,
                    },
                ],
                direction: ShiftDirection::Up,
            },
        )
        .unwrap();

    assert_eq!(
        orders(&store, owner),
        named(&[("A", 1), ("C", 2), ("D", 3), ("B", 4)])
    );
}

#[test]
fn reorder_down_moves_active_earlier_and_shifts_range_up() {
    let mut store = setup();
    let owner = Uuid::new_v4();
    let ids = seed_sections(&mut store, owner, &["A", "B", "C", "D"]);

    // Entry order on the wire does not matter.
    store
        .apply_reorder(
            owner,
            &ReorderRequest {
                active_section_id: ids[3],
                over_section_id: ids[1],
                shift_set: vec![
                    ShiftEntry {
                        section_id: ids[2],
                        order: 3,
                    },
                    ShiftEntry {
                        section_id: ids[1],
                        order: 2,
                    },
                ],
                direction: ShiftDirection::Down,
            },
        )
        .unwrap();

    assert_eq!(
        orders(&store, owner),
        named(&[("A", 1), ("D", 2), ("B", 3), ("C", 4)])
    );
}

#[test]
fn reorder_with_stale_shift_set_is_rejected_without_changes() {
    let mut store = setup();
    let owner = Uuid::new_v4();
    let ids = seed_sections(&mut store, owner, &["A", "B", "C", "D"]);

    let missing_entry = ReorderRequest {
        active_section_id: ids[0],
        over_section_id: ids[2],
        shift_set: vec![ShiftEntry {
            section_id: ids[1],
            order: 2,
        }],
        direction: ShiftDirection::Up,
    };
    let err = store.apply_reorder(owner, &missing_entry).unwrap_err();
    assert!(matches!(err, OrderStoreError::StaleShiftSet(_)));

    let wrong_direction = ReorderRequest {
        active_section_id: ids[0],
        over_section_id: ids[1],
        shift_set: vec![ShiftEntry {
            section_id: ids[1],
            order: 2,
        }],
        direction: ShiftDirection::Down,
    };
    let err = store.apply_reorder(owner, &wrong_direction).unwrap_err();
    assert_eq!(err.code(), "stale_shift_set");

    let self_drop = ReorderRequest {
        active_section_id: ids[0],
        over_section_id: ids[0],
        shift_set: Vec::new(),
        direction: ShiftDirection::Up,
    };
    assert!(store.apply_reorder(owner, &self_drop).is_err());

    assert_eq!(
        orders(&store, owner),
        named(&[("A", 1), ("B", 2), ("C", 3), ("D", 4)])
    );
}

#[test]
fn reorder_by_other_owner_is_forbidden() {
    let mut store = setup();
    let owner = Uuid::new_v4();
    let intruder = Uuid::new_v4();
    let ids = seed_sections(&mut store, owner, &["A", "B"]);

    let err = store
        .apply_reorder(
            intruder,
            &ReorderRequest {
                active_section_id: ids[0],
                over_section_id: ids[1],
                shift_set: vec![ShiftEntry {
                    section_id: ids[1],
                    order: 2,
                }],
                direction: ShiftDirection::Up,
            },
        )
        .unwrap_err();
    match err {
        OrderStoreError::Forbidden { actor, entity } => {
            assert_eq!(actor, intruder);
            assert_eq!(entity, ids[0]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(orders(&store, owner), named(&[("A", 1), ("B", 2)]));
}

#[test]
fn apply_move_is_idempotent_and_checks_ownership_and_scope() {
    let mut store = setup();
    let owner = Uuid::new_v4();
    let ids = seed_sections(&mut store, owner, &["A", "B"]);
    let classroom = store
        .create_classroom(owner, ids[0], "Biology", Some("science"))
        .unwrap();

    let request = MoveRequest {
        item_id: classroom.classroom_id,
        section_id: ids[1],
        scope: Scope::Creation,
    };
    store.apply_move(owner, &request).unwrap();
    store.apply_move(owner, &request).unwrap();
    let moved = store
        .get_item::<Classroom>(classroom.classroom_id)
        .unwrap()
        .unwrap();
    assert_eq!(moved.section_id, ids[1]);

    let err = store.apply_move(Uuid::new_v4(), &request).unwrap_err();
    assert_eq!(err.code(), "forbidden");

    let joined = store
        .create_section(owner, Scope::Membership, "Joined", None)
        .unwrap();
    let err = store
        .apply_move(
            owner,
            &MoveRequest {
                item_id: classroom.classroom_id,
                section_id: joined.section_id,
                scope: Scope::Creation,
            },
        )
        .unwrap_err();
    assert!(matches!(err, OrderStoreError::ScopeMismatch { .. }));

    let err = store
        .apply_move(
            owner,
            &MoveRequest {
                item_id: Uuid::new_v4(),
                section_id: ids[0],
                scope: Scope::Creation,
            },
        )
        .unwrap_err();
    assert_eq!(err.code(), "item_not_found");
}

#[test]
fn delete_section_reassigns_items_to_default_and_compacts_orders() {
    let mut store = setup();
    let owner = Uuid::new_v4();
    let ids = seed_sections(&mut store, owner, &["General", "Spring", "Fall", "Archive"]);
    store
        .create_classroom(owner, ids[0], "Homeroom", None)
        .unwrap();
    store
        .create_classroom(owner, ids[1], "Chemistry", None)
        .unwrap();
    store
        .create_classroom(owner, ids[1], "Physics", None)
        .unwrap();

    let deletion = store.delete_section(owner, ids[1]).unwrap();
    assert_eq!(deletion.default_section_id, ids[0]);
    assert_eq!(deletion.reassigned_items, 2);
    assert_eq!(deletion.compacted_sections, 2);

    assert_eq!(
        orders(&store, owner),
        named(&[("General", 1), ("Fall", 2), ("Archive", 3)])
    );
    let buckets = store.load_buckets::<Classroom>(owner).unwrap();
    assert_eq!(buckets[0].items.len(), 3);
    assert!(store.get_section(ids[1]).unwrap().is_none());
}

#[test]
fn default_section_cannot_be_deleted_until_default_moves() {
    let mut store = setup();
    let owner = Uuid::new_v4();
    let ids = seed_sections(&mut store, owner, &["A", "B"]);

    let err = store.delete_section(owner, ids[0]).unwrap_err();
    assert!(matches!(err, OrderStoreError::DefaultSectionUndeletable(id) if id == ids[0]));

    store.set_default_section(owner, ids[1]).unwrap();
    let sections = store.list_sections(owner, Scope::Creation).unwrap();
    assert!(!sections[0].is_default);
    assert!(sections[1].is_default);

    store.delete_section(owner, ids[0]).unwrap();
    assert_eq!(orders(&store, owner), named(&[("B", 1)]));
}

#[test]
fn update_section_renames_for_owner_only() {
    let mut store = setup();
    let owner = Uuid::new_v4();
    let ids = seed_sections(&mut store, owner, &["A"]);

    let updated = store
        .update_section(owner, ids[0], "Period 1", Some("star"))
        .unwrap();
    assert_eq!(updated.display_name, "Period 1");
    assert_eq!(updated.icon.as_deref(), Some("star"));
    assert_eq!(updated.sort_order, 1);

    let err = store
        .update_section(Uuid::new_v4(), ids[0], "Mine", None)
        .unwrap_err();
    assert_eq!(err.code(), "forbidden");
}

#[test]
fn load_buckets_groups_memberships_by_section() {
    let mut store = setup();
    let member = Uuid::new_v4();
    let current = store
        .create_section(member, Scope::Membership, "Current", None)
        .unwrap();
    let past = store
        .create_section(member, Scope::Membership, "Past", None)
        .unwrap();
    store
        .create_membership(member, current.section_id, "Art", Some("Ms. Rivera"))
        .unwrap();
    store
        .create_membership(member, past.section_id, "Music", None)
        .unwrap();
    store
        .create_membership(member, past.section_id, "Drama", None)
        .unwrap();

    let buckets = store.load_buckets::<Membership>(member).unwrap();
    assert_eq!(buckets.len(), 2);
    assert_eq!(buckets[0].section_id(), current.section_id);
    assert_eq!(buckets[0].items.len(), 1);
    assert_eq!(buckets[0].items[0].teacher_name.as_deref(), Some("Ms. Rivera"));
    let past_names: Vec<&str> = buckets[1]
        .items
        .iter()
        .map(|item| item.classroom_name.as_str())
        .collect();
    assert_eq!(past_names, vec!["Music", "Drama"]);

    let err = store
        .create_membership(member, Uuid::new_v4(), "Ghost", None)
        .unwrap_err();
    assert_eq!(err.code(), "section_not_found");
}

#[test]
fn file_backed_store_persists_orders_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("classdeck.db");
    let owner = Uuid::new_v4();

    {
        let mut store = SqliteOrderStore::open(&path).unwrap();
        let ids = seed_sections(&mut store, owner, &["A", "B", "C"]);
        store
            .apply_reorder(
                owner,
                &ReorderRequest {
                    active_section_id: ids[2],
                    over_section_id: ids[0],
                    shift_set: vec![
                        ShiftEntry {
                            section_id: ids[0],
                            order: 1,
                        },
                        ShiftEntry {
                            section_id: ids[1],
                            order: 2,
                        },
                    ],
                    direction: ShiftDirection::Down,
                },
            )
            .unwrap();
    }

    let reopened = SqliteOrderStore::open(&path).unwrap();
    assert_eq!(
        orders(&reopened, owner),
        named(&[("C", 1), ("A", 2), ("B", 3)])
    );
}
