use super::{finish, Context};
use annotate_editor::{Mutation, Value};
use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use colored::Colorize;

#[derive(Debug, Args)]
pub struct EditArgs {
    /// Document identifier, e.g. street/0001/f1.json
    pub document: String,

    #[command(subcommand)]
    pub action: EditAction,
}

#[derive(Debug, Subcommand)]
pub enum EditAction {
    /// Write a JSON value verbatim
    Set {
        /// Dotted path, e.g. $.annotations.0.attributes.plate
        path: String,
        /// JSON literal: 12, "12", true, {"a": 1}
        json: String,
    },

    /// Write field text, coerced to a number, boolean or string
    Input { path: String, text: String },

    /// Remove a key or list element
    Delete { path: String },

    /// Rename the last key of the path; a blank name deletes it
    Rename {
        path: String,
        #[arg(allow_hyphen_values = true)]
        name: String,
    },

    /// Add a placeholder property inside a mapping or list
    AddProperty { path: String },
}

pub async fn edit(args: EditArgs, ctx: &Context) -> Result<()> {
    let mut session = ctx.open(&args.document).await?;

    let mutation = match args.action {
        EditAction::Set { path, json } => Mutation::set(&path, parse_json(&json)?)?,
        EditAction::Input { path, text } => Mutation::input(&path, text)?,
        EditAction::Delete { path } => Mutation::delete(&path)?,
        EditAction::Rename { path, name } => Mutation::rename(&path, name)?,
        EditAction::AddProperty { path } => {
            let created = session.add_property(&path)?;
            println!("  {} Added {}", "✓".green(), created);
            finish(session).await?;
            return Ok(());
        }
    };

    let description = mutation.to_string();
    let applied = session.apply(mutation)?;
    if applied.is_empty() {
        println!("  {} {} (unchanged)", "•".dimmed(), description);
    }
    for mutation in &applied {
        println!("  {} {}", "✓".green(), mutation);
    }
    tracing::debug!("{} mutation(s) applied to {}", applied.len(), args.document);

    finish(session).await?;
    Ok(())
}

fn parse_json(literal: &str) -> Result<Value> {
    let parsed: serde_json::Value =
        serde_json::from_str(literal).with_context(|| format!("'{}' is not a JSON value", literal))?;
    Ok(Value::from(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use annotate_editor::Document;
    use std::fs;

    fn workspace() -> (tempfile::TempDir, Context) {
        let dir = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("datasets/street")).unwrap();
        fs::write(
            dir.path().join("datasets/street/f1.json"),
            r#"{"name":"f1","keywords":[],"frame":{"path":"street/f1.png"},"annotations":[{"id":0,"attributes":{"plate":"AB"}}]}"#,
        )
        .unwrap();
        let ctx = Context::new(&dir.path().display().to_string(), None, None).unwrap();
        (dir, ctx)
    }

    async fn reload(ctx: &Context) -> Document {
        ctx.datasets().load("street/f1.json").await.unwrap()
    }

    fn args(action: EditAction) -> EditArgs {
        EditArgs {
            document: "street/f1.json".into(),
            action,
        }
    }

    #[tokio::test]
    async fn test_input_is_coerced_and_saved() {
        let (_dir, ctx) = workspace();
        edit(
            args(EditAction::Input {
                path: "$.annotations.0.attributes.count".into(),
                text: "12".into(),
            }),
            &ctx,
        )
        .await
        .unwrap();

        let doc = reload(&ctx).await;
        assert_eq!(doc.get("$.annotations.0.attributes.count").unwrap(), Some(&Value::Int(12)));
    }

    #[tokio::test]
    async fn test_set_keeps_json_type() {
        let (_dir, ctx) = workspace();
        edit(
            args(EditAction::Set {
                path: "$.annotations.0.attributes.count".into(),
                json: "\"12\"".into(),
            }),
            &ctx,
        )
        .await
        .unwrap();

        let doc = reload(&ctx).await;
        assert_eq!(doc.get("$.annotations.0.attributes.count").unwrap(), Some(&Value::from("12")));
    }

    #[tokio::test]
    async fn test_rename_and_add_property() {
        let (_dir, ctx) = workspace();
        edit(
            args(EditAction::Rename {
                path: "$.annotations.0.attributes.plate".into(),
                name: "licence".into(),
            }),
            &ctx,
        )
        .await
        .unwrap();
        edit(
            args(EditAction::AddProperty {
                path: "$.annotations.0.attributes".into(),
            }),
            &ctx,
        )
        .await
        .unwrap();

        let doc = reload(&ctx).await;
        assert_eq!(doc.get("$.annotations.0.attributes.plate").unwrap(), None);
        assert_eq!(doc.get("$.annotations.0.attributes.licence").unwrap(), Some(&Value::from("AB")));
        assert_eq!(doc.get("$.annotations.0.attributes.name").unwrap(), Some(&Value::from("value")));
    }

    #[tokio::test]
    async fn test_rejected_edit_leaves_file_untouched() {
        let (dir, ctx) = workspace();
        let before = fs::read_to_string(dir.path().join("datasets/street/f1.json")).unwrap();

        let result = edit(
            args(EditAction::Rename {
                path: "$.annotations.0.id".into(),
                name: "key".into(),
            }),
            &ctx,
        )
        .await;

        assert!(result.is_err());
        let after = fs::read_to_string(dir.path().join("datasets/street/f1.json")).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_json_literals() {
        assert_eq!(parse_json("12").unwrap(), Value::Int(12));
        assert_eq!(parse_json("\"12\"").unwrap(), Value::from("12"));
        let err = parse_json("{oops").unwrap_err();
        assert!(err.to_string().contains("not a JSON value"));
    }
}
