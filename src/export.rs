use std::io::{Cursor, Write};

use anyhow::Context;
use zip::{ZipWriter, write::FileOptions};

use crate::{
    assets::{ImageLoader, decode},
    compose::{self, CompositeParams, OUTPUT_WIDTH},
    error::{SlidesmithError, SlidesmithResult},
    render::Frame,
    slide::{Deck, Slide},
    surface::SurfaceProvider,
};

/// Encode a composited frame as PNG bytes (straight alpha).
pub fn encode_png(frame: &Frame) -> SlidesmithResult<Vec<u8>> {
    let mut data = frame.data.clone();
    if frame.premultiplied {
        decode::unpremultiply_rgba8_in_place(&mut data);
    }
    let img = image::RgbaImage::from_raw(frame.width, frame.height, data)
        .ok_or_else(|| SlidesmithError::encode("frame byte length mismatch"))?;

    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .context("encode png")?;
    Ok(buf)
}

/// Composite one slide and encode it. `None` when the slide has no resolved
/// image yet.
pub fn render_slide_png(
    slide: &Slide,
    params: &CompositeParams,
    images: &mut dyn ImageLoader,
    surfaces: &mut dyn SurfaceProvider,
) -> SlidesmithResult<Option<Vec<u8>>> {
    match compose::composite(slide, params, images, surfaces)? {
        Some(surface) => Ok(Some(encode_png(&surface.frame())?)),
        None => Ok(None),
    }
}

/// File stem safe for archives and filesystems.
pub fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    let out = out.trim_end_matches('-').to_string();
    if out.is_empty() { "carousel".to_string() } else { out }
}

/// Composite every slide sequentially and return `(file name, png bytes)`
/// pairs named `{stem}-{n}.png` with a 1-based index.
///
/// Sequential on purpose: decoding N full-resolution backgrounds at once is
/// how constrained environments run out of memory. Slides without a resolved
/// image are skipped with a warning.
pub fn render_deck_pngs(
    deck: &Deck,
    name: &str,
    preview_width: f32,
    images: &mut dyn ImageLoader,
    surfaces: &mut dyn SurfaceProvider,
) -> SlidesmithResult<Vec<(String, Vec<u8>)>> {
    let params = CompositeParams::for_deck(deck, preview_width);
    let stem = sanitize_name(name);
    let mut out = Vec::new();

    for (i, slide) in deck.slides.iter().enumerate() {
        match render_slide_png(slide, &params, images, surfaces)? {
            Some(png) => {
                let file = format!("{stem}-{}.png", i + 1);
                tracing::debug!(slide = %slide.id, file, "slide rendered");
                out.push((file, png));
            }
            None => {
                tracing::warn!(slide = %slide.id, "slide has no image yet; skipped");
            }
        }
    }
    Ok(out)
}

/// All slides into one zip archive.
pub fn export_zip(
    deck: &Deck,
    name: &str,
    preview_width: f32,
    images: &mut dyn ImageLoader,
    surfaces: &mut dyn SurfaceProvider,
) -> SlidesmithResult<Vec<u8>> {
    let pages = render_deck_pngs(deck, name, preview_width, images, surfaces)?;
    if pages.is_empty() {
        return Err(SlidesmithError::encode("deck has no renderable slides"));
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default();
    for (file, png) in pages {
        writer
            .start_file(file, options)
            .context("write zip entry")?;
        writer.write_all(&png).context("write zip content")?;
    }
    let cursor = writer.finish().context("finalize zip")?;
    Ok(cursor.into_inner())
}

/// All slides into one PDF, one full-bleed page per slide.
///
/// Slides are composited at the fixed 1080px reference width regardless of
/// the live preview size, so document quality matches the width backgrounds
/// were sourced at.
pub fn export_pdf(
    deck: &Deck,
    title: &str,
    images: &mut dyn ImageLoader,
    surfaces: &mut dyn SurfaceProvider,
) -> SlidesmithResult<Vec<u8>> {
    use printpdf::{Image, ImageTransform, Mm, PdfDocument};

    let pages = render_deck_pngs(deck, title, OUTPUT_WIDTH as f32, images, surfaces)?;
    if pages.is_empty() {
        return Err(SlidesmithError::encode("deck has no renderable slides"));
    }

    let mut doc = None;
    let mut layers = Vec::new();
    for (idx, (_, png)) in pages.iter().enumerate() {
        // Decode through printpdf's bundled image crate so the embedded
        // image type matches the one it expects.
        let image = printpdf::image_crate::load_from_memory(png)
            .context("decode rendered pdf page")?;
        let width_mm = px_to_mm(image.width());
        let height_mm = px_to_mm(image.height());

        if idx == 0 {
            let (doc_handle, page, layer) =
                PdfDocument::new(title, Mm(width_mm), Mm(height_mm), "Layer 1");
            doc = Some(doc_handle);
            layers.push((page, layer, image));
        } else if let Some(doc_handle) = doc.as_mut() {
            let (page, layer) =
                doc_handle.add_page(Mm(width_mm), Mm(height_mm), format!("Layer {}", idx + 1));
            layers.push((page, layer, image));
        }
    }

    let doc = doc.ok_or_else(|| SlidesmithError::encode("no pages to render"))?;
    for (page, layer, image) in layers.into_iter() {
        let current_layer = doc.get_page(page).get_layer(layer);
        let pdf_image = Image::from_dynamic_image(&image);
        let transform = ImageTransform {
            translate_x: Some(Mm(0.0)),
            translate_y: Some(Mm(0.0)),
            rotate: None,
            scale_x: Some(1.0),
            scale_y: Some(1.0),
            dpi: Some(72.0),
        };
        pdf_image.add_to_layer(current_layer, transform);
    }

    let mut buffer = Vec::new();
    {
        let mut writer = std::io::BufWriter::new(&mut buffer);
        doc.save(&mut writer).context("write pdf")?;
    }
    Ok(buffer)
}

fn px_to_mm(px: u32) -> f32 {
    let inches = px as f32 / 72.0;
    inches * 25.4
}
