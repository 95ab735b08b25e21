use classdeck_core::service::board_service::default_section_name;
use classdeck_core::{
    BoardService, BoardServiceError, Classroom, Scope, SectionRepository, SectionValidationError,
    SqliteOrderStore,
};
use uuid::Uuid;

fn service() -> BoardService<SqliteOrderStore> {
    BoardService::new(SqliteOrderStore::open_in_memory().unwrap())
}

#[test]
fn create_section_normalizes_name_and_icon() {
    let mut service = service();
    let owner = Uuid::new_v4();

    let section = service
        .create_section(owner, Scope::Creation, "  Period 2  ", Some(" flask "))
        .unwrap();
    assert_eq!(section.display_name, "Period 2");
    assert_eq!(section.icon.as_deref(), Some("flask"));

    let err = service
        .create_section(owner, Scope::Creation, "   ", None)
        .unwrap_err();
    assert!(matches!(
        err,
        BoardServiceError::Validation(SectionValidationError::BlankDisplayName)
    ));

    let err = service
        .create_section(owner, Scope::Creation, "Ok", Some("no spaces allowed"))
        .unwrap_err();
    assert!(matches!(
        err,
        BoardServiceError::Validation(SectionValidationError::InvalidIcon(_))
    ));
}

#[test]
fn create_classroom_without_section_bootstraps_default() {
    let mut service = service();
    let owner = Uuid::new_v4();

    let first = service
        .create_classroom(owner, None, "Latin", Some("  "))
        .unwrap();
    let second = service.create_classroom(owner, None, "Greek", None).unwrap();
    assert_eq!(first.section_id, second.section_id);
    assert!(first.subject.is_none());

    let snapshot = service.load_snapshot::<Classroom>(owner).unwrap();
    assert_eq!(snapshot.buckets().len(), 1);
    let default = snapshot.default_section().unwrap();
    assert_eq!(default.display_name, default_section_name(Scope::Creation));
    assert_eq!(snapshot.item_count(), 2);
}

#[test]
fn ensure_default_section_returns_existing_default() {
    let mut service = service();
    let owner = Uuid::new_v4();
    let created = service
        .create_section(owner, Scope::Membership, "Fall term", None)
        .unwrap();

    let ensured = service
        .ensure_default_section(owner, Scope::Membership)
        .unwrap();
    assert_eq!(ensured.section_id, created.section_id);
    assert_eq!(
        service
            .repo()
            .list_sections(owner, Scope::Membership)
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn delete_and_default_rules_surface_as_service_errors() {
    let mut service = service();
    let owner = Uuid::new_v4();
    let general = service
        .create_section(owner, Scope::Creation, "General", None)
        .unwrap();
    let extra = service
        .create_section(owner, Scope::Creation, "Extra", None)
        .unwrap();
    service
        .create_classroom(owner, Some(extra.section_id), "Poetry", None)
        .unwrap();

    let err = service
        .delete_section(owner, general.section_id)
        .unwrap_err();
    assert!(matches!(err, BoardServiceError::DefaultSectionUndeletable(id) if id == general.section_id));

    let err = service
        .delete_section(Uuid::new_v4(), extra.section_id)
        .unwrap_err();
    assert!(matches!(err, BoardServiceError::Forbidden(id) if id == extra.section_id));

    let deletion = service.delete_section(owner, extra.section_id).unwrap();
    assert_eq!(deletion.reassigned_items, 1);
    let snapshot = service.load_snapshot::<Classroom>(owner).unwrap();
    assert_eq!(snapshot.buckets().len(), 1);
    assert_eq!(snapshot.buckets()[0].items.len(), 1);
}

#[test]
fn update_and_set_default_go_through_validation_and_ownership() {
    let mut service = service();
    let owner = Uuid::new_v4();
    service
        .create_section(owner, Scope::Creation, "First", None)
        .unwrap();
    let second = service
        .create_section(owner, Scope::Creation, "Second", None)
        .unwrap();

    let renamed = service
        .update_section(owner, second.section_id, " Honors ", None)
        .unwrap();
    assert_eq!(renamed.display_name, "Honors");
    let too_long = "x".repeat(500);
    assert!(matches!(
        service.update_section(owner, second.section_id, &too_long, None),
        Err(BoardServiceError::Validation(
            SectionValidationError::DisplayNameTooLong(_)
        ))
    ));

    service
        .set_default_section(owner, second.section_id)
        .unwrap();
    let snapshot = service.load_snapshot::<Classroom>(owner).unwrap();
    assert_eq!(
        snapshot.default_section().unwrap().section_id,
        second.section_id
    );

    let joined = service
        .create_section(owner, Scope::Membership, "Joined", None)
        .unwrap();
    let err = service
        .create_classroom(owner, Some(joined.section_id), "Wrong scope", None)
        .unwrap_err();
    assert!(matches!(err, BoardServiceError::WrongScope(id) if id == joined.section_id));
}
