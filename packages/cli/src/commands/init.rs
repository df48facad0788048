use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Frames directory
    #[arg(long, default_value = "frames")]
    pub frames_dir: String,

    /// Datasets directory
    #[arg(long, default_value = "datasets")]
    pub datasets_dir: String,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!("{} {} already exists", "⚠️".yellow(), DEFAULT_CONFIG_NAME.bright_white());
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing annotation workspace...".bright_blue().bold());

    for dir in [&args.frames_dir, &args.datasets_dir] {
        let path = PathBuf::from(cwd).join(dir);
        if !path.exists() {
            fs::create_dir_all(&path)?;
            println!("  {} Created {}/", "✓".green(), dir);
        }
    }

    let config = Config {
        frames_dir: args.frames_dir.clone(),
        datasets_dir: args.datasets_dir.clone(),
        ..Config::default()
    };
    fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("Next steps:");
    println!("  1. Copy extracted frames into {}/", args.frames_dir);
    println!("  2. Run: annotate frames");
    println!("  3. Run: annotate convert <frame>");

    Ok(())
}
