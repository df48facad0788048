use super::{finish, Context};
use annotate_editor::{BoundingBox, HandleAction, Point, Value, ZoomState, MOVE_THROTTLE};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::time::Instant;

/// Replay a pointer drag on an annotation, as if done on the canvas
#[derive(Debug, Args)]
pub struct DragArgs {
    /// Document identifier, e.g. street/0001/f1.json
    pub document: String,

    /// Annotation index
    pub index: usize,

    /// Handle grabbed: move, top, bottom, left, right, top-left, ...
    pub handle: HandleAction,

    /// Horizontal pointer travel in screen pixels
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub dx: f64,

    /// Vertical pointer travel in screen pixels
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub dy: f64,

    /// Canvas zoom: pixels added to the frame's native width
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub zoom: f64,

    /// Number of pointer moves the travel is split into
    #[arg(long, default_value = "1")]
    pub steps: u32,
}

pub async fn drag(args: DragArgs, ctx: &Context) -> Result<()> {
    let mut session = ctx.open(&args.document).await?;
    session.set_zoom(ZoomState::new(args.zoom));

    let growth = session.growth();
    tracing::debug!("Dragging {} of annotation {} at growth {:?}", args.handle, args.index, growth);

    let origin = Point::new(0.0, 0.0);
    session.begin_drag(args.index, args.handle, origin)?;

    let start = Instant::now();
    let steps = args.steps.max(1);
    for step in 1..=steps {
        let fraction = step as f64 / steps as f64;
        let pointer = Point::new(args.dx * fraction, args.dy * fraction);
        session.drag_to(pointer, start + MOVE_THROTTLE * step)?;
    }
    session.end_drag()?;

    if let Some(annotation) = session.document().annotations().get(args.index) {
        if let Some(b) = annotation.get("bounding_box").and_then(BoundingBox::from_value) {
            println!("  {} {} → ({}, {}) {}×{}", "✓".green(), args.handle, b.x, b.y, b.width, b.height);
        }
        let selected = annotation.get("isSelected").and_then(Value::as_bool).unwrap_or(false);
        println!("    selected: {}", selected);
    }

    finish(session).await?;
    Ok(())
}
