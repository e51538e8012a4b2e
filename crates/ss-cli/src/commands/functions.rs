use std::path::Path;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use ss_script::{DirectoryLoader, FunctionRepository};

pub fn run(scripts: &Path) -> Result<(), String> {
    let loader = DirectoryLoader::new(scripts);
    let repository = FunctionRepository::scan(&loader, &[]).map_err(|e| e.to_string())?;

    if repository.is_empty() {
        println!("  No function scripts found in {}.", scripts.display());
        return Ok(());
    }

    println!(
        "  {} {}",
        "Functions".bold(),
        format!("({} in {})", repository.len(), scripts.display()).dimmed()
    );
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Id", "Category", "Owner", "Function", "Params"]);
    for function in repository.iter() {
        table.add_row(vec![
            function.id.to_string(),
            function.category.to_string(),
            function.owner.clone(),
            function.name.clone(),
            function.parameter_count.to_string(),
        ]);
    }
    println!("{table}");

    Ok(())
}
