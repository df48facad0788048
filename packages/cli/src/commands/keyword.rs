use super::{finish, Context};
use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

#[derive(Debug, Args)]
pub struct KeywordArgs {
    /// Document identifier, e.g. street/0001/f1.json
    pub document: String,

    #[command(subcommand)]
    pub action: KeywordAction,
}

#[derive(Debug, Subcommand)]
pub enum KeywordAction {
    /// Append a keyword
    Add { keyword: String },
    /// Remove the keyword at an index
    Remove { index: usize },
}

pub async fn keyword(args: KeywordArgs, ctx: &Context) -> Result<()> {
    let mut session = ctx.open(&args.document).await?;

    let changed = match &args.action {
        KeywordAction::Add { keyword } => session.add_keyword(keyword)?,
        KeywordAction::Remove { index } => session.remove_keyword(*index)?,
    };
    if !changed {
        println!("  {} Keywords unchanged", "•".dimmed());
    }
    println!("  keywords: {}", session.document().keywords().join(", "));

    finish(session).await?;
    Ok(())
}
