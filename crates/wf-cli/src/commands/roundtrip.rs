use std::path::Path;

use colored::Colorize;

pub fn run(file: &Path, output: Option<&Path>) -> Result<(), String> {
    let wf = super::load(file)?;
    let path = wf.filename().unwrap_or(file);
    let original =
        std::fs::read_to_string(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;

    if let Some(out) = output {
        wf.save(Some(out)).map_err(|e| e.to_string())?;
        println!("  Wrote {}", out.display());
    }

    let rendered = wf.render();
    if rendered == original {
        println!("  {} ({} bytes)", "byte-identical".green(), rendered.len());
        return Ok(());
    }

    let line = original
        .lines()
        .zip(rendered.lines())
        .position(|(a, b)| a != b)
        .map_or_else(|| original.lines().count().min(rendered.lines().count()) + 1, |i| i + 1);
    println!("  {} at line {line}", "differs".red());
    Err("output differs from input".into())
}
