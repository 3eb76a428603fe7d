use anyhow::{Context, Result};
use image::DynamicImage;
use image::imageops::FilterType;

use super::HandlerContext;

/// Scale to half width and height, never below one pixel.
pub(crate) fn halve(img: &DynamicImage) -> DynamicImage {
    img.resize_exact(
        (img.width() / 2).max(1),
        (img.height() / 2).max(1),
        FilterType::Triangle,
    )
}

pub(super) fn resize_credit_card(ctx: &HandlerContext<'_>) -> Result<String> {
    let input = ctx.data_root.resolve("credit-card.png")?;
    let output = ctx.data_root.resolve("credit-card-resized.png")?;
    let img = image::open(&input).with_context(|| format!("open image {}", input.display()))?;
    halve(&img)
        .save(&output)
        .with_context(|| format!("save image {}", output.display()))?;
    Ok("B7 executed: Image resized.".to_string())
}
