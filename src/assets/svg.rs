use std::sync::Arc;

use anyhow::Context;

use crate::{
    assets::PreparedImage,
    error::{SlidesmithError, SlidesmithResult},
};

// Logos are small; anything beyond this is a malformed or hostile file.
const MAX_DIM: u32 = 8_192;

/// Parse an SVG and rasterize it at its natural size into premultiplied RGBA8.
///
/// The compositor scales the result like any raster logo, so natural size is
/// the right resolution for the fixed logo-percent sizes this crate draws.
pub fn rasterize_svg(bytes: &[u8]) -> SlidesmithResult<PreparedImage> {
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(bytes, &opts).context("parse svg tree")?;

    let size = tree.size();
    let width = dimension_px(size.width())?;
    let height = dimension_px(size.height())?;
    if width > MAX_DIM || height > MAX_DIM {
        return Err(SlidesmithError::render(format!(
            "svg raster size too large: {width}x{height} (max {MAX_DIM}x{MAX_DIM})"
        )));
    }

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| SlidesmithError::render("failed to allocate svg pixmap"))?;

    let sx = (width as f32) / size.width();
    let sy = (height as f32) / size.height();
    let xform = resvg::tiny_skia::Transform::from_scale(sx, sy);
    resvg::render(&tree, xform, &mut pixmap.as_mut());

    // tiny-skia pixmaps are already premultiplied RGBA8.
    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(pixmap.data().to_vec()),
    })
}

fn dimension_px(v: f32) -> SlidesmithResult<u32> {
    if !v.is_finite() || v <= 0.0 {
        return Err(SlidesmithError::render("svg has invalid width/height"));
    }
    Ok((v.ceil() as u32).max(1))
}
