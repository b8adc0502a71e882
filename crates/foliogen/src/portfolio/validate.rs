use crate::prelude::{println, *};
use colored::Colorize;
use foliogen_core::portfolio::{classify, validate};

#[derive(Debug, clap::Args, serde::Serialize, serde::Deserialize, Clone)]
pub struct ValidateOptions {
    /// Project directory to check
    #[arg(default_value = ".")]
    pub project: std::path::PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(options: ValidateOptions, global: crate::Global) -> Result<()> {
    let files = super::load_project_files(&options.project)?;

    if global.verbose {
        let classification = classify(&files);
        println!(
            "Loaded {} files from {} ({})",
            files.len(),
            options.project.display(),
            if classification.initial_build {
                "incomplete project"
            } else {
                "complete project"
            }
        );
    }

    let report = validate(&files);

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.passed {
        println!("{}", "Project structure OK".green().bold());
    } else {
        println!("{}", "Structural problems found:".red().bold());
        for problem in &report.problems {
            println!("  {} {}", "-".red(), problem);
        }
    }

    if report.passed {
        Ok(())
    } else {
        Err(eyre!(
            "validation failed with {} problem(s)",
            report.problems.len()
        ))
    }
}
