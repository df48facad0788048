mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    annotation, convert, datasets, drag, edit, frames, init, keyword, show, AnnotationArgs, Context, ConvertArgs,
    DatasetsArgs, DragArgs, EditArgs, FramesArgs, InitArgs, KeywordArgs, ShowArgs,
};

/// Annotate CLI - label regions on extracted video frames
#[derive(Parser, Debug)]
#[command(name = "annotate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log at debug level (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Frames directory (overrides config)
    #[arg(long, global = true)]
    frames_dir: Option<String>,

    /// Datasets directory (overrides config)
    #[arg(long, global = true)]
    datasets_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default annotate.config.json
    Init(InitArgs),

    /// List frames waiting to be converted
    Frames(FramesArgs),

    /// Create the annotation document for a frame
    Convert(ConvertArgs),

    /// List annotation documents
    Datasets(DatasetsArgs),

    /// Print a document and its annotations
    Show(ShowArgs),

    /// Edit any property of a document by path
    Edit(EditArgs),

    /// Add, delete, select or hide annotations
    Annotation(AnnotationArgs),

    /// Manage document keywords
    Keyword(KeywordArgs),

    /// Drag an annotation body or resize handle
    Drag(DragArgs),
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli, cwd: &str) -> anyhow::Result<()> {
    let context = || Context::new(cwd, cli.frames_dir.clone(), cli.datasets_dir.clone());

    match cli.command {
        Command::Init(args) => init(args, cwd),
        Command::Frames(args) => frames(args, &context()?).await.map(drop),
        Command::Convert(args) => convert(args, &context()?).await.map(drop),
        Command::Datasets(args) => datasets(args, &context()?).await.map(drop),
        Command::Show(args) => show(args, &context()?).await,
        Command::Edit(args) => edit(args, &context()?).await,
        Command::Annotation(args) => annotation(args, &context()?).await,
        Command::Keyword(args) => keyword(args, &context()?).await,
        Command::Drag(args) => drag(args, &context()?).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match std::env::current_dir() {
        Ok(cwd) => run(cli, &cwd.display().to_string()).await,
        Err(err) => Err(err.into()),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
