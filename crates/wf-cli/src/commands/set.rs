use std::path::Path;

use wf_core::value::is_number_literal;

pub fn run(
    file: &Path,
    entity: usize,
    name: &str,
    value: &str,
    index: usize,
    output: Option<&Path>,
) -> Result<(), String> {
    let mut wf = super::load(file)?;
    let id = super::entity_arg(&wf, entity)?;

    let written = if let Ok(n) = value.parse::<i64>() {
        wf.write_tuple_int(id, name, index, n)
    } else if let Some(x) = value.parse::<f64>().ok().filter(|_| is_number_literal(value)) {
        wf.write_tuple_float(id, name, index, x)
    } else {
        wf.write_tuple_string(id, name, index, value)
    };
    written.map_err(|e| e.to_string())?;

    wf.save(output).map_err(|e| e.to_string())?;

    let target = output.or(wf.filename()).unwrap_or(file);
    let values = super::property_values(&wf, id, name).join(" ");
    println!("  {name} = {values}");
    println!("  Saved {}", target.display());
    Ok(())
}
