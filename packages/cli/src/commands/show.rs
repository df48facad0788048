use super::Context;
use annotate_editor::{BoundingBox, Document, InputKind, Value};
use anyhow::Result;
use clap::Args;
use colored::Colorize;

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Document identifier, e.g. street/0001/f1.json
    pub document: String,

    /// Print the raw document as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn show(args: ShowArgs, ctx: &Context) -> Result<()> {
    let document = ctx.datasets().load(&args.document).await?;

    if args.json {
        println!("{}", document.to_json_pretty()?);
    } else {
        print!("{}", render(&document));
    }
    Ok(())
}

/// Human-readable summary: name, keywords, one line per annotation and its
/// attributes with the field kind an editor would use for them
pub fn render(document: &Document) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", document.name().unwrap_or("(unnamed)").bold()));
    out.push_str(&format!("  keywords: {}\n", document.keywords().join(", ")));

    for (index, annotation) in document.annotations().iter().enumerate() {
        let title = document.annotation_title(index).unwrap_or_default();
        let selected = annotation.get("isSelected").and_then(Value::as_bool).unwrap_or(false);
        let hidden = annotation.get("hidden").and_then(Value::as_bool).unwrap_or(false);

        let marker = if selected { "●".green() } else { "○".normal() };
        let title = if hidden { title.dimmed() } else { title.normal() };
        let bounds = annotation
            .get("bounding_box")
            .and_then(BoundingBox::from_value)
            .map(|b| format!("({}, {}) {}×{}", b.x, b.y, b.width, b.height))
            .unwrap_or_default();
        out.push_str(&format!("  {} {:>3}  {}  {}\n", marker, index, title, bounds.dimmed()));

        if let Some(attributes) = annotation.get("attributes").and_then(Value::as_map) {
            for (key, value) in attributes {
                out.push_str(&format!(
                    "        {}: {} {}\n",
                    key,
                    value,
                    format!("[{}]", InputKind::for_value(value)).dimmed()
                ));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_lists_annotations() {
        colored::control::set_override(false);
        let document = Document::from_json(
            r##"{
                "name": "f1",
                "keywords": ["street", "f1"],
                "annotations": [
                    {"id": 0, "name": "car", "isSelected": true,
                     "bounding_box": {"x": 10, "y": 10, "width": 50, "height": 50},
                     "attributes": {"plate": "AB-12", "occluded": false, "tint": "#ff0000"}},
                    {"id": 3, "parent_id": 1, "name": ""}
                ]
            }"##,
        )
        .unwrap();

        let text = render(&document);
        assert!(text.starts_with("f1\n"));
        assert!(text.contains("keywords: street, f1"));
        assert!(text.contains("●   0  {0} car  (10, 10) 50×50"));
        assert!(text.contains("plate: AB-12 [text]"));
        assert!(text.contains("occluded: false [checkbox]"));
        assert!(text.contains("tint: #ff0000 [color]"));
        assert!(text.contains("{3} [1] Annotation"));
    }
}
