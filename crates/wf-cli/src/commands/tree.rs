use std::path::Path;

use comfy_table::{ContentArrangement, Table};
use wf_core::EntityId;
use wf_dsl::WorldFile;

pub fn run(file: &Path) -> Result<(), String> {
    let wf = super::load(file)?;

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Id", "Type", "Declared as", "Line", "Properties"]);

    add_rows(&wf, &mut table, EntityId::GLOBAL, 0);
    // Entities created without a parent are roots alongside the global entity.
    for root in wf.children(None).filter(|&id| id != EntityId::GLOBAL) {
        add_rows(&wf, &mut table, root, 0);
    }

    println!("{table}");
    println!();
    println!("  {} entities", wf.entity_count());

    Ok(())
}

fn add_rows(wf: &WorldFile, table: &mut Table, entity: EntityId, depth: usize) {
    let base = wf.entity_type(entity).unwrap_or_default();
    let immediate = wf.entity_immediate_type(entity).unwrap_or_default();
    let type_col = if entity == EntityId::GLOBAL {
        "(global)".to_string()
    } else {
        format!("{}{base}", "  ".repeat(depth))
    };
    let declared = if immediate == base {
        "-".to_string()
    } else {
        immediate.to_string()
    };
    let props = wf.store().properties_of(entity).count();
    let line = wf.entity_line(entity).unwrap_or_default();

    table.add_row(vec![
        entity.to_string(),
        type_col,
        declared,
        line.to_string(),
        props.to_string(),
    ]);

    let children: Vec<EntityId> = wf.children(Some(entity)).collect();
    for child in children {
        let child_depth = if entity == EntityId::GLOBAL { depth } else { depth + 1 };
        add_rows(wf, table, child, child_depth);
    }
}
