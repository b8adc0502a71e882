use crate::prelude::{eprintln, println, *};
use foliogen_core::portfolio::{system_prompt, Mode};

#[derive(Debug, clap::Args, serde::Serialize, serde::Deserialize, Clone)]
pub struct PromptOptions {
    /// Generation mode: code, design, advanced-code, strategy, approaches
    #[arg(short, long, default_value = "code")]
    pub mode: String,
}

pub async fn run(options: PromptOptions, global: crate::Global) -> Result<()> {
    let mode = Mode::from_label(&options.mode);

    if global.verbose {
        eprintln!("Mode: {}", mode.label());
    }

    println!("{}", system_prompt(mode));

    Ok(())
}
