use crate::{
    assets::{ImageLoader, ImageRef},
    error::{SlidesmithError, SlidesmithResult},
    layout::{self, TextBlock, TextFont},
    markup,
    slide::{Deck, Slide},
    style::{HorizontalAlign, OverlaySpec, PillSpec, StyleSpec, VerticalAlign},
    surface::{DrawSurface, Rect, ShadowPaint, SurfaceProvider, TextPaint},
};

/// Export canvas width in pixels. Backgrounds are sourced at this width, so
/// document export renders against it regardless of the live preview size.
pub const OUTPUT_WIDTH: u32 = 1080;

// Fractions of the canvas width.
const CONTENT_PADDING_FRAC: f32 = 0.07;
const LOGO_PADDING_FRAC: f32 = 0.04;

/// Gap between the body block and the CTA pill, at preview scale.
const CTA_TOP_MARGIN: f32 = 16.0;

/// Canvas shape presets.
///
/// `Portrait` is labelled `4:5` for the feed format it targets, but all
/// pixel math intentionally uses a 3:4 height (`width * 4 / 3`); exported
/// sizes must stay byte-compatible with that historical behavior.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:5")]
    Portrait,
}

impl AspectRatio {
    pub fn canvas_size(self) -> (u32, u32) {
        match self {
            Self::Square => (OUTPUT_WIDTH, OUTPUT_WIDTH),
            Self::Portrait => (
                OUTPUT_WIDTH,
                (OUTPUT_WIDTH as f32 * 4.0 / 3.0).round() as u32,
            ),
        }
    }

    /// Ratio string sent to image generators. The portrait preset requests
    /// `3:4`, matching the canvas it will be stretched onto.
    pub fn image_request_ratio(self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Portrait => "3:4",
        }
    }

    /// UI-facing label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Portrait => "4:5",
        }
    }
}

/// Per-deck compositing knobs shared by every slide.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositeParams {
    pub logo: Option<ImageRef>,
    /// Logo width as a percentage of the canvas width.
    pub logo_size_percent: f32,
    pub overlay: OverlaySpec,
    pub aspect_ratio: AspectRatio,
    /// Width of the on-screen preview the styles were authored against.
    pub preview_width: f32,
}

impl CompositeParams {
    pub fn for_deck(deck: &Deck, preview_width: f32) -> Self {
        Self {
            logo: deck.logo.clone(),
            logo_size_percent: deck.logo_size_percent,
            overlay: deck.overlay,
            aspect_ratio: deck.aspect_ratio,
            preview_width,
        }
    }
}

/// Render one slide onto a fresh surface.
///
/// Returns `Ok(None)` when the slide has no resolved background image yet;
/// nothing is drawn in that case. A background or logo that fails to load
/// degrades to "not drawn" with a warning instead of failing the composite.
pub fn composite(
    slide: &Slide,
    params: &CompositeParams,
    images: &mut dyn ImageLoader,
    surfaces: &mut dyn SurfaceProvider,
) -> SlidesmithResult<Option<Box<dyn DrawSurface>>> {
    let Some(background) = slide.image.as_ref() else {
        return Ok(None);
    };
    if !params.preview_width.is_finite() || params.preview_width <= 0.0 {
        return Err(SlidesmithError::validation(
            "preview width must be finite and > 0",
        ));
    }

    let (canvas_w, canvas_h) = params.aspect_ratio.canvas_size();
    let scale = canvas_w as f32 / params.preview_width;

    let title_style = slide.title_style.scaled(scale);
    let body_style = slide.body_style.scaled(scale);
    let cta_style = slide.cta.style.scaled(scale);
    let pill = slide.cta.background.scaled(scale);
    let spacing = slide.layout.block_spacing * scale;
    let cta_margin = CTA_TOP_MARGIN * scale;

    let mut surface = surfaces.create_surface(canvas_w, canvas_h)?;
    let w = canvas_w as f32;
    let h = canvas_h as f32;

    // Confirm fonts best-effort; an unready font falls back at draw time.
    for (block, style) in [
        ("title", &title_style),
        ("body", &body_style),
        ("cta", &cta_style),
    ] {
        if !surface.font_ready(&TextFont::of(style)) {
            tracing::warn!(
                block,
                family = %style.font.family,
                "font not confirmed ready; rendering with fallback"
            );
        }
    }

    match images.load(background) {
        Ok(img) => surface.draw_image(&img, Rect::new(0.0, 0.0, w, h))?,
        Err(err) => tracing::warn!(
            slide = %slide.id,
            %err,
            "background failed to load; compositing without it"
        ),
    }

    if params.overlay.enabled && params.overlay.opacity > 0.0 {
        surface.fill_rect(
            Rect::new(0.0, 0.0, w, h),
            params.overlay.color,
            params.overlay.opacity,
        )?;
    }

    let mut reserved_logo_height = 0.0f32;
    if let Some(logo_ref) = &params.logo {
        match images.load(logo_ref) {
            Ok(logo) if logo.width > 0 => {
                let logo_pad = w * LOGO_PADDING_FRAC;
                let logo_w = w * (params.logo_size_percent / 100.0);
                let logo_h = logo_w * logo.height as f32 / logo.width as f32;
                surface.draw_image(&logo, Rect::new(logo_pad, logo_pad, logo_w, logo_h))?;
                reserved_logo_height = logo_pad + logo_h;
            }
            Ok(_) => {
                tracing::warn!(slide = %slide.id, "logo has zero natural width; omitted");
            }
            Err(err) => {
                tracing::warn!(slide = %slide.id, %err, "logo failed to load; omitted");
            }
        }
    }

    // All wrapping happens at target resolution with target-scale styles.
    let padding = w * CONTENT_PADDING_FRAC;
    let content_width = w - 2.0 * padding;

    let title_block = layout::wrap(
        &markup::parse(&slide.title),
        &TextFont::of(&title_style),
        content_width,
        &mut *surface,
    );
    let body_block = layout::wrap(
        &markup::parse(&slide.body),
        &TextFont::of(&body_style),
        content_width,
        &mut *surface,
    );

    let cta_block = slide.cta.is_active().then(|| {
        // The pill's own horizontal padding narrows the wrap width.
        layout::wrap(
            &markup::parse(&slide.cta.text),
            &TextFont::of(&cta_style),
            content_width - 2.0 * pill.padding_x,
            &mut *surface,
        )
    });
    let pill_size = cta_block.as_ref().map(|block| {
        (
            block.max_line_width() + 2.0 * pill.padding_x,
            block.total_height() + 2.0 * pill.padding_y,
        )
    });

    let title_height = title_block.total_height();
    let body_height = body_block.total_height();
    let mut total_text_height = title_height + spacing + body_height;
    if let Some((_, pill_h)) = pill_size {
        total_text_height += cta_margin + pill_h;
    }

    let start_y = resolve_start_y(
        slide.layout.vertical_align,
        h,
        total_text_height,
        reserved_logo_height,
        padding,
    );

    draw_block(surface.as_mut(), &title_block, &title_style, w, padding, start_y)?;
    let body_top = start_y + title_height + spacing;
    draw_block(surface.as_mut(), &body_block, &body_style, w, padding, body_top)?;

    if let (Some(block), Some((pill_w, pill_h))) = (&cta_block, pill_size) {
        let pill_x = line_x(cta_style.align, w, padding, pill_w);
        let pill_y = body_top + body_height + cta_margin;
        surface.fill_rounded_rect(
            Rect::new(pill_x, pill_y, pill_w, pill_h),
            pill.corner_radius,
            pill.color,
        )?;
        draw_cta_text(surface.as_mut(), block, &cta_style, &pill, pill_x, pill_y, pill_w)?;
    }

    Ok(Some(surface))
}

/// Start Y of the text stack under the vertical-alignment policy.
///
/// `top` sits below the reserved logo region when there is one; `center` is
/// clamped downward so the stack never overlaps that region; `bottom` keeps
/// the content padding below the stack.
fn resolve_start_y(
    align: VerticalAlign,
    canvas_h: f32,
    total_height: f32,
    reserved_logo_height: f32,
    padding: f32,
) -> f32 {
    match align {
        VerticalAlign::Top => {
            if reserved_logo_height > 0.0 {
                reserved_logo_height + padding
            } else {
                padding
            }
        }
        VerticalAlign::Center => {
            let y = (canvas_h - total_height) / 2.0;
            if reserved_logo_height > 0.0 {
                y.max(reserved_logo_height)
            } else {
                y
            }
        }
        VerticalAlign::Bottom => canvas_h - padding - total_height,
    }
}

/// Line origin for a given alignment. Center and right align against the
/// full canvas width (not the text column), matching the preview.
fn line_x(align: HorizontalAlign, canvas_w: f32, padding: f32, line_width: f32) -> f32 {
    match align {
        HorizontalAlign::Left => padding,
        HorizontalAlign::Center => (canvas_w - line_width) / 2.0,
        HorizontalAlign::Right => canvas_w - padding - line_width,
    }
}

fn draw_block(
    surface: &mut dyn DrawSurface,
    block: &TextBlock,
    style: &StyleSpec,
    canvas_w: f32,
    padding: f32,
    top: f32,
) -> SlidesmithResult<()> {
    let font = TextFont::of(style);
    let shadow = ShadowPaint::from_spec(&style.shadow);
    let line_height = block.line_height();

    for (i, line) in block.lines.iter().enumerate() {
        let y = top + i as f32 * line_height;
        let mut x = line_x(style.align, canvas_w, padding, line.width());
        for fragment in &line.fragments {
            let paint = TextPaint {
                font: font.clone(),
                color: if fragment.highlighted {
                    style.highlight_color
                } else {
                    style.color
                },
                shadow,
            };
            surface.fill_text(&fragment.text, x, y, &paint)?;
            x += fragment.width;
        }
    }
    Ok(())
}

/// CTA text inside the pill. Lines align within the pill interior and never
/// cast a shadow, whatever the CTA style says.
fn draw_cta_text(
    surface: &mut dyn DrawSurface,
    block: &TextBlock,
    style: &StyleSpec,
    pill: &PillSpec,
    pill_x: f32,
    pill_y: f32,
    pill_w: f32,
) -> SlidesmithResult<()> {
    let font = TextFont::of(style);
    let interior_w = pill_w - 2.0 * pill.padding_x;
    let line_height = block.line_height();

    for (i, line) in block.lines.iter().enumerate() {
        let y = pill_y + pill.padding_y + i as f32 * line_height;
        let offset = match style.align {
            HorizontalAlign::Left => 0.0,
            HorizontalAlign::Center => (interior_w - line.width()) / 2.0,
            HorizontalAlign::Right => interior_w - line.width(),
        };
        let mut x = pill_x + pill.padding_x + offset;
        for fragment in &line.fragments {
            let paint = TextPaint {
                font: font.clone(),
                color: if fragment.highlighted {
                    style.highlight_color
                } else {
                    style.color
                },
                shadow: None,
            };
            surface.fill_text(&fragment.text, x, y, &paint)?;
            x += fragment.width;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_canvas_is_1080() {
        assert_eq!(AspectRatio::Square.canvas_size(), (1080, 1080));
    }

    #[test]
    fn portrait_canvas_keeps_the_3_4_pixel_height() {
        assert_eq!(AspectRatio::Portrait.canvas_size(), (1080, 1440));
        assert_eq!(AspectRatio::Portrait.label(), "4:5");
        assert_eq!(AspectRatio::Portrait.image_request_ratio(), "3:4");
    }

    #[test]
    fn aspect_ratio_serializes_as_its_label() {
        assert_eq!(
            serde_json::to_string(&AspectRatio::Portrait).unwrap(),
            "\"4:5\""
        );
        let parsed: AspectRatio = serde_json::from_str("\"1:1\"").unwrap();
        assert_eq!(parsed, AspectRatio::Square);
    }

    #[test]
    fn top_alignment_respects_reserved_logo_space() {
        assert_eq!(
            resolve_start_y(VerticalAlign::Top, 1080.0, 100.0, 0.0, 75.6),
            75.6
        );
        assert_eq!(
            resolve_start_y(VerticalAlign::Top, 1080.0, 100.0, 173.0, 75.6),
            173.0 + 75.6
        );
    }

    #[test]
    fn center_alignment_is_clamped_below_the_logo() {
        let centered = resolve_start_y(VerticalAlign::Center, 1080.0, 80.0, 0.0, 75.6);
        assert_eq!(centered, 500.0);
        let clamped = resolve_start_y(VerticalAlign::Center, 1080.0, 900.0, 173.0, 75.6);
        assert_eq!(clamped, 173.0);
    }

    #[test]
    fn bottom_alignment_keeps_the_content_padding() {
        assert_eq!(
            resolve_start_y(VerticalAlign::Bottom, 1080.0, 100.0, 0.0, 75.6),
            1080.0 - 75.6 - 100.0
        );
    }

    #[test]
    fn line_x_aligns_against_the_full_canvas() {
        assert_eq!(line_x(HorizontalAlign::Left, 1080.0, 75.6, 200.0), 75.6);
        assert_eq!(line_x(HorizontalAlign::Center, 1080.0, 75.6, 200.0), 440.0);
        assert_eq!(
            line_x(HorizontalAlign::Right, 1080.0, 75.6, 200.0),
            1080.0 - 75.6 - 200.0
        );
    }
}
