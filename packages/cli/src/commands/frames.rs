use super::Context;
use anyhow::Result;
use clap::Args;
use colored::Colorize;

#[derive(Debug, Args)]
pub struct FramesArgs {
    /// Folder inside the frames directory
    #[arg(default_value = "")]
    pub folder: String,
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Frame image, relative to the frames directory
    pub frame: String,
}

/// List folders and frames still waiting to be converted
pub async fn frames(args: FramesArgs, ctx: &Context) -> Result<Vec<String>> {
    let items = ctx.frames().list(&args.folder).await?;

    if items.is_empty() {
        println!("{}", "⚠️  Nothing left to convert".yellow());
    }
    for item in &items {
        println!("  {}", item);
    }
    Ok(items)
}

/// Turn a frame into an annotation document
pub async fn convert(args: ConvertArgs, ctx: &Context) -> Result<String> {
    let conversion = ctx.frames().convert(&args.frame).await?;

    println!(
        "  {} {} → {}",
        "✓".green(),
        args.frame,
        conversion.identifier.bright_white()
    );
    let keywords = conversion.document.keywords().join(", ");
    println!("    keywords: {}", keywords.dimmed());
    Ok(conversion.identifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_convert_then_list() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("frames/cam/12")).unwrap();
        fs::write(dir.path().join("frames/cam/12/a.png"), b"").unwrap();
        fs::write(dir.path().join("frames/cam/12/b.png"), b"").unwrap();
        let ctx = Context::new(&dir.path().display().to_string(), None, None).unwrap();

        let identifier = convert(ConvertArgs { frame: "cam/12/a.png".into() }, &ctx).await.unwrap();
        assert_eq!(identifier, "cam/12/a.json");
        assert!(dir.path().join("datasets/cam/12/a.json").is_file());

        let left = frames(FramesArgs { folder: "cam/12".into() }, &ctx).await.unwrap();
        assert_eq!(left, vec!["b.png"]);
    }
}
