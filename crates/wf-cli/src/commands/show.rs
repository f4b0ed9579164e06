use std::path::Path;

use colored::Colorize;

pub fn run(file: &Path, entity: usize) -> Result<(), String> {
    let wf = super::load(file)?;
    let id = super::entity_arg(&wf, entity)?;

    let base = wf.entity_type(id).unwrap_or_default();
    let immediate = wf.entity_immediate_type(id).unwrap_or_default();
    let title = if base.is_empty() { "(global)" } else { base };
    if immediate != base {
        println!("  {} {} [{}]", id, title.bold(), immediate.dimmed());
    } else {
        println!("  {} {}", id, title.bold());
    }
    if let Some(parent) = wf.entity_parent(id) {
        println!("  parent:     {parent}");
    }
    if let Some(line) = wf.entity_line(id).filter(|&l| l > 0) {
        println!("  line:       {line}");
    }
    println!();

    let props: Vec<_> = wf.store().properties_of(id).map(|(_, p)| p).collect();
    if props.is_empty() {
        println!("  {}", "no properties".dimmed());
    }
    let width = props.iter().map(|p| p.name.len()).max().unwrap_or(0);
    for prop in props {
        let values = super::property_values(&wf, id, &prop.name).join(" ");
        let values = if prop.brackets.is_some() {
            format!("[ {values} ]")
        } else {
            values
        };
        let origin = if prop.inherited {
            format!("  (from {immediate})").dimmed().to_string()
        } else {
            String::new()
        };
        let line = wf
            .property_line(id, &prop.name)
            .filter(|&l| l > 0)
            .map_or_else(String::new, |l| format!("  line {l}").dimmed().to_string());
        println!("  {:<width$}  {values}{origin}{line}", prop.name);
    }

    let children: Vec<_> = wf.children(Some(id)).collect();
    if !children.is_empty() {
        println!();
        println!("  {}", "Children".bold());
        for child in children {
            println!(
                "    {} {}",
                child,
                wf.entity_type(child).unwrap_or_default()
            );
        }
    }

    Ok(())
}
