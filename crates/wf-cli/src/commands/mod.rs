pub mod check;
pub mod dump;
pub mod roundtrip;
pub mod set;
pub mod show;
pub mod tree;

use std::path::Path;

use log::debug;
use wf_core::EntityId;
use wf_dsl::diagnostics::{Diagnostic, render_diagnostics};
use wf_dsl::{LoadConfig, WorldFile};

/// Load a worldfile using `WORLDFILE_PATH` and print any diagnostics.
fn load(file: &Path) -> Result<WorldFile, String> {
    let config = LoadConfig::from_env();
    if !config.search_path.is_empty() {
        debug!("search path: {:?}", config.search_path);
    }
    let mut wf = WorldFile::with_config(config);
    let loaded = wf.load(file);
    print_diagnostics(&wf, wf.diagnostics());
    loaded.map_err(|e| e.to_string())?;
    Ok(wf)
}

/// Print diagnostics to stderr using ariadne, followed by a count.
fn print_diagnostics(wf: &WorldFile, diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }

    eprint!("{}", render_diagnostics(wf.sources(), diagnostics));

    let errors = diagnostics.iter().filter(|d| d.is_error()).count();
    let warnings = diagnostics.len() - errors;

    if errors > 0 {
        eprintln!(
            "  {} error{}, {} warning{}",
            errors,
            if errors == 1 { "" } else { "s" },
            warnings,
            if warnings == 1 { "" } else { "s" },
        );
    } else if warnings > 0 {
        eprintln!(
            "  {} warning{}",
            warnings,
            if warnings == 1 { "" } else { "s" },
        );
    }
}

/// Validate an entity id given on the command line.
fn entity_arg(wf: &WorldFile, id: usize) -> Result<EntityId, String> {
    if id < wf.entity_count() {
        Ok(EntityId(id))
    } else {
        Err(format!(
            "no entity {id} (the file has {} entities)",
            wf.entity_count()
        ))
    }
}

/// Values of a property as they appear in the file.
fn property_values(wf: &WorldFile, entity: EntityId, name: &str) -> Vec<String> {
    wf.property(entity, name)
        .map(|p| {
            p.values
                .iter()
                .map(|slot| {
                    slot.and_then(|id| wf.token(id))
                        .map_or_else(|| "-".to_string(), ToString::to_string)
                })
                .collect()
        })
        .unwrap_or_default()
}
