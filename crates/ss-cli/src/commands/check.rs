use std::path::PathBuf;

use colored::Colorize;

pub fn run(files: &[PathBuf]) -> Result<(), String> {
    let mut failed = 0;

    for path in files {
        let source = std::fs::read_to_string(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        match ss_script::check(&source) {
            Ok(()) => println!("  {} {}", "ok".green().bold(), path.display()),
            Err(problem) => {
                failed += 1;
                println!(
                    "  {} {}:{}: {}",
                    "FAIL".red().bold(),
                    path.display(),
                    problem.line,
                    problem.error
                );
            }
        }
    }

    if failed > 0 {
        return Err(format!("{failed} of {} scripts have problems", files.len()));
    }
    Ok(())
}
