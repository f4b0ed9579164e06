use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::Serialize;
use wf_core::{EntityStore, MacroTable, UnitTable};

/// Which text listing to print.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Section {
    Tokens,
    Entities,
    Properties,
    Macros,
}

#[derive(Serialize)]
struct Snapshot<'a> {
    filename: Option<PathBuf>,
    units: UnitTable,
    entities: &'a EntityStore,
    macros: &'a MacroTable,
}

pub fn run(file: &Path, json: bool, section: Option<Section>) -> Result<(), String> {
    let wf = super::load(file)?;

    if json {
        let snapshot = Snapshot {
            filename: wf.filename().map(Path::to_path_buf),
            units: wf.units(),
            entities: wf.store(),
            macros: wf.macros(),
        };
        let output = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| format!("JSON serialization failed: {e}"))?;
        println!("{output}");
        return Ok(());
    }

    match section {
        Some(Section::Tokens) => print!("{}", wf.dump_tokens()),
        Some(Section::Entities) => print!("{}", wf.dump_entities()),
        Some(Section::Properties) => print!("{}", wf.dump_properties()),
        Some(Section::Macros) => print!("{}", wf.dump_macros()),
        None => {
            println!("# entities");
            print!("{}", wf.dump_entities());
            println!();
            println!("# macros");
            print!("{}", wf.dump_macros());
            println!();
            println!("# properties");
            print!("{}", wf.dump_properties());
        }
    }

    Ok(())
}
