//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `classdeck_core` linkage end to end: store, service, drag engine.
//! - Keep output deterministic apart from generated ids.

use classdeck_core::{
    BoardService, Classroom, CoreConfig, CreationBoard, DragEntity, InlineReconciler, Scope,
    Snapshot,
};
use std::error::Error;
use std::process::ExitCode;
use uuid::Uuid;

fn main() -> ExitCode {
    println!("classdeck_core ping={}", classdeck_core::ping());
    println!("classdeck_core version={}", classdeck_core::core_version());
    match run_probe() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("probe failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_probe() -> Result<(), Box<dyn Error>> {
    let config = CoreConfig::from_env()?;
    config.init_logging()?;

    let owner = Uuid::new_v4();
    let mut service = BoardService::new(config.open_store()?);
    let mut section_ids = Vec::new();
    for name in ["A", "B", "C", "D"] {
        section_ids.push(
            service
                .create_section(owner, Scope::Creation, name, None)?
                .section_id,
        );
    }
    service.create_classroom(owner, Some(section_ids[1]), "Algebra I", Some("math"))?;

    let snapshot = service.load_snapshot::<Classroom>(owner)?;
    print_orders("before", &snapshot);

    let store = service.into_repo();
    let mut board = CreationBoard::new(owner, snapshot, InlineReconciler::new(store))
        .with_rollback_policy(config.rollback_policy);
    board.drag_start(DragEntity::Section(section_ids[0]))?;
    let outcome = board.drag_end(section_ids[2])?;
    println!("drop outcome={outcome:?}");
    for notice in board.poll_reconciliation() {
        println!("notice code={} kind={}", notice.error_code, notice.request_kind);
    }
    print_orders("optimistic", board.snapshot());

    let service = BoardService::new(board.into_reconciler().into_store());
    print_orders("persisted", &service.load_snapshot::<Classroom>(owner)?);
    Ok(())
}

fn print_orders(label: &str, snapshot: &Snapshot<Classroom>) {
    let orders: Vec<String> = snapshot
        .buckets()
        .iter()
        .map(|bucket| {
            format!(
                "{}={}({})",
                bucket.section.display_name,
                bucket.section.sort_order,
                bucket.items.len()
            )
        })
        .collect();
    println!("{label}: {}", orders.join(" "));
}
