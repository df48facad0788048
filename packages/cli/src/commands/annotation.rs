use super::{finish, Context};
use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

#[derive(Debug, Args)]
pub struct AnnotationArgs {
    /// Document identifier, e.g. street/0001/f1.json
    pub document: String,

    #[command(subcommand)]
    pub action: AnnotationAction,
}

#[derive(Debug, Subcommand)]
pub enum AnnotationAction {
    /// Append a new annotation with the next free id
    Add,
    /// Remove the annotation at an index
    Delete { index: usize },
    /// Make the annotation at an index the only selected one
    Select { index: usize },
    /// Flip the selection of the annotation at an index
    Toggle { index: usize },
    /// Flip the hidden flag of the annotation at an index
    Hide { index: usize },
}

pub async fn annotation(args: AnnotationArgs, ctx: &Context) -> Result<()> {
    let mut session = ctx.open(&args.document).await?;

    match args.action {
        AnnotationAction::Add => {
            let id = session.add_annotation()?;
            println!("  {} Added annotation {}", "✓".green(), id);
        }
        AnnotationAction::Delete { index } => {
            let title = session.document().annotation_title(index).unwrap_or_default();
            session.delete_annotation(index)?;
            println!("  {} Deleted {}", "✓".green(), title);
        }
        AnnotationAction::Select { index } => {
            session.select(index)?;
            println!("  {} Selected annotation {}", "✓".green(), index);
        }
        AnnotationAction::Toggle { index } => {
            let selected = session.toggle_selected(index)?;
            let state = if selected { "selected" } else { "deselected" };
            println!("  {} Annotation {} {}", "✓".green(), index, state);
        }
        AnnotationAction::Hide { index } => {
            let hidden = session.toggle_hidden(index)?;
            let state = if hidden { "hidden" } else { "shown" };
            println!("  {} Annotation {} {}", "✓".green(), index, state);
        }
    }

    finish(session).await?;
    Ok(())
}
