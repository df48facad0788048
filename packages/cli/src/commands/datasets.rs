use super::Context;
use anyhow::Result;
use clap::Args;

#[derive(Debug, Args)]
pub struct DatasetsArgs {
    /// Folder inside the datasets directory
    #[arg(default_value = "")]
    pub folder: String,
}

/// List folders and annotation documents
pub async fn datasets(args: DatasetsArgs, ctx: &Context) -> Result<Vec<String>> {
    let items = ctx.datasets().list(&args.folder).await?;
    for item in &items {
        println!("  {}", item);
    }
    Ok(items)
}
