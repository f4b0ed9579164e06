use std::path::Path;

pub fn run(file: &Path, unused: bool) -> Result<(), String> {
    let mut wf = super::load(file)?;

    println!("  All checks passed for '{}'.", file.display());
    println!(
        "  {} entities, {} properties, {} macros",
        wf.entity_count(),
        wf.property_count(),
        wf.macros().len()
    );

    let before = wf.diagnostics().len();
    if unused && wf.warn_unused() {
        println!("  {} properties never read", wf.unused_properties().count());
        super::print_diagnostics(&wf, &wf.diagnostics()[before..]);
    }

    Ok(())
}
