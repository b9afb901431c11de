use std::{
    collections::{HashMap, HashSet},
    path::Path,
    sync::Arc,
};

use anyhow::Context;

use crate::{
    assets::PreparedImage,
    error::{SlidesmithError, SlidesmithResult},
    layout::{TextFont, TextMeasurer},
    render::{Frame, blur, composite},
    style::Color,
    surface::{DrawSurface, Rect, SurfaceProvider, TextPaint},
};

// Width-per-character estimate used only when no fonts are registered at
// all; keeps layout deterministic while glyph drawing is skipped.
const FALLBACK_ADVANCE_EM: f32 = 0.6;

/// Font files available to the renderer. Families are discovered from the
/// font data itself when a surface registers the library with parley.
#[derive(Clone, Default)]
pub struct FontLibrary {
    fonts: Vec<Arc<Vec<u8>>>,
}

impl FontLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, bytes: Vec<u8>) {
        self.fonts.push(Arc::new(bytes));
    }

    /// Load every `.ttf`/`.otf` file in `dir`. Returns how many were added.
    pub fn load_dir(&mut self, dir: &Path) -> SlidesmithResult<usize> {
        let entries =
            std::fs::read_dir(dir).with_context(|| format!("read font dir '{}'", dir.display()))?;
        let mut added = 0usize;
        for entry in entries {
            let path = entry.context("read font dir entry")?.path();
            let is_font = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("ttf") || e.eq_ignore_ascii_case("otf"));
            if !is_font {
                continue;
            }
            let bytes =
                std::fs::read(&path).with_context(|| format!("read font '{}'", path.display()))?;
            self.add(bytes);
            added += 1;
        }
        Ok(added)
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}

/// Creates [`CpuSurface`]s sharing one font library.
pub struct CpuSurfaceProvider {
    fonts: FontLibrary,
}

impl CpuSurfaceProvider {
    pub fn new(fonts: FontLibrary) -> Self {
        Self { fonts }
    }
}

impl SurfaceProvider for CpuSurfaceProvider {
    fn create_surface(
        &mut self,
        width: u32,
        height: u32,
    ) -> SlidesmithResult<Box<dyn DrawSurface>> {
        Ok(Box::new(CpuSurface::new(width, height, &self.fonts)?))
    }
}

/// CPU raster surface: a premultiplied RGBA8 buffer drawn through
/// short-lived `vello_cpu` render contexts, with parley shaping both the
/// measurement and the glyph runs so the two can never disagree.
pub struct CpuSurface {
    width: u32,
    height: u32,
    width_u16: u16,
    height_u16: u16,
    pixels: Vec<u8>,

    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<Color>,
    font_data: HashMap<String, vello_cpu::peniko::FontData>,
    family_order: Vec<String>,
    missing_warned: HashSet<String>,
}

impl CpuSurface {
    pub fn new(width: u32, height: u32, fonts: &FontLibrary) -> SlidesmithResult<Self> {
        let width_u16: u16 = width
            .try_into()
            .map_err(|_| SlidesmithError::render("surface width exceeds u16"))?;
        let height_u16: u16 = height
            .try_into()
            .map_err(|_| SlidesmithError::render("surface height exceeds u16"))?;
        if width == 0 || height == 0 {
            return Err(SlidesmithError::render("surface size must be non-zero"));
        }

        let mut surface = Self {
            width,
            height,
            width_u16,
            height_u16,
            pixels: vec![0u8; width as usize * height as usize * 4],
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            font_data: HashMap::new(),
            family_order: Vec::new(),
            missing_warned: HashSet::new(),
        };

        for bytes in &fonts.fonts {
            surface.register_font(bytes)?;
        }
        Ok(surface)
    }

    fn register_font(&mut self, bytes: &Arc<Vec<u8>>) -> SlidesmithResult<()> {
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes.as_ref().clone()), None);
        if families.is_empty() {
            return Err(SlidesmithError::render(
                "no font families registered from font bytes",
            ));
        }
        for (id, _) in families {
            let Some(name) = self.font_ctx.collection.family_name(id).map(str::to_string) else {
                continue;
            };
            let data = vello_cpu::peniko::FontData::new(
                vello_cpu::peniko::Blob::from(bytes.as_ref().clone()),
                0,
            );
            self.font_data.insert(name.to_lowercase(), data);
            self.family_order.push(name);
        }
        Ok(())
    }

    fn first_family(stack: &str) -> &str {
        stack.split(',').next().unwrap_or(stack).trim()
    }

    /// Font bytes to draw glyphs with: the requested family when registered,
    /// otherwise the first registered family, otherwise nothing.
    fn resolve_font_data(&mut self, font: &TextFont) -> Option<vello_cpu::peniko::FontData> {
        let family = Self::first_family(&font.stack);
        if let Some(data) = self.font_data.get(&family.to_lowercase()) {
            return Some(data.clone());
        }
        if let Some(first) = self.family_order.first() {
            if self.missing_warned.insert(family.to_string()) {
                tracing::warn!(family, substitute = first.as_str(), "font family not registered");
            }
            return self.font_data.get(&first.to_lowercase()).cloned();
        }
        if self.missing_warned.insert(family.to_string()) {
            tracing::warn!(family, "no fonts registered; text will not be drawn");
        }
        None
    }

    fn shape(&mut self, text: &str, font: &TextFont, brush: Color) -> parley::Layout<Color> {
        let stack = if self.font_data.contains_key(&Self::first_family(&font.stack).to_lowercase())
        {
            font.stack.clone()
        } else {
            // Substitute families consistently for shaping and painting.
            self.family_order
                .first()
                .cloned()
                .unwrap_or_else(|| font.stack.clone())
        };

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(stack)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(font.size));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<Color> = builder.build(text);
        layout.break_all_lines(None);
        layout
    }

    /// Render ops into a fresh transparent scratch pixmap and source-over the
    /// result onto the surface buffer.
    fn paint_ops(
        &mut self,
        encode: impl FnOnce(&mut vello_cpu::RenderContext),
    ) -> SlidesmithResult<()> {
        let mut ctx = vello_cpu::RenderContext::new(self.width_u16, self.height_u16);
        encode(&mut ctx);
        let mut scratch = vello_cpu::Pixmap::new(self.width_u16, self.height_u16);
        ctx.flush();
        ctx.render_to_pixmap(&mut scratch);
        composite::over_in_place(&mut self.pixels, scratch.data_as_u8_slice(), 1.0)
    }

    /// Rasterize one shaped layout in `color` at `(x, y)` into a standalone
    /// premultiplied buffer.
    fn rasterize_layout(
        &self,
        layout: &parley::Layout<Color>,
        font_data: &vello_cpu::peniko::FontData,
        x: f32,
        y: f32,
        color: Color,
    ) -> Vec<u8> {
        let mut ctx = vello_cpu::RenderContext::new(self.width_u16, self.height_u16);
        encode_layout(&mut ctx, layout, font_data, x, y, color);
        let mut scratch = vello_cpu::Pixmap::new(self.width_u16, self.height_u16);
        ctx.flush();
        ctx.render_to_pixmap(&mut scratch);
        scratch.data_as_u8_slice().to_vec()
    }
}

fn encode_layout(
    ctx: &mut vello_cpu::RenderContext,
    layout: &parley::Layout<Color>,
    font_data: &vello_cpu::peniko::FontData,
    x: f32,
    y: f32,
    color: Color,
) {
    ctx.set_transform(vello_cpu::kurbo::Affine::translate((f64::from(x), f64::from(y))));
    ctx.set_paint(to_peniko_color(color));
    for line in layout.lines() {
        for item in line.items() {
            let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                continue;
            };
            let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                id: g.id,
                x: g.x,
                y: g.y,
            });
            ctx.glyph_run(font_data)
                .font_size(run.run().font_size())
                .fill_glyphs(glyphs);
        }
    }
}

impl TextMeasurer for CpuSurface {
    fn measure_text(&mut self, text: &str, font: &TextFont) -> f32 {
        if text.is_empty() {
            return 0.0;
        }
        if self.font_data.is_empty() {
            return text.chars().count() as f32 * font.size * FALLBACK_ADVANCE_EM;
        }
        let layout = self.shape(text, font, Color::BLACK);
        layout.full_width()
    }
}

impl DrawSurface for CpuSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn draw_image(&mut self, image: &PreparedImage, dest: Rect) -> SlidesmithResult<()> {
        if image.width == 0 || image.height == 0 {
            return Err(SlidesmithError::render("cannot draw an empty image"));
        }
        let paint =
            image_paint_from_premul(image.rgba8_premul.as_slice(), image.width, image.height)?;

        let sx = f64::from(dest.width) / f64::from(image.width);
        let sy = f64::from(dest.height) / f64::from(image.height);
        let transform =
            vello_cpu::kurbo::Affine::translate((f64::from(dest.x), f64::from(dest.y)))
                * vello_cpu::kurbo::Affine::scale_non_uniform(sx, sy);
        let image_rect = vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(image.width),
            f64::from(image.height),
        );

        self.paint_ops(move |ctx| {
            ctx.set_transform(transform);
            ctx.set_paint(paint);
            ctx.fill_rect(&image_rect);
        })
    }

    fn fill_rect(&mut self, rect: Rect, color: Color, opacity: f32) -> SlidesmithResult<()> {
        if opacity <= 0.0 {
            return Ok(());
        }
        let fill = to_peniko_color(color.with_opacity(opacity));
        let target = to_kurbo_rect(rect);
        self.paint_ops(move |ctx| {
            ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.set_paint(fill);
            ctx.fill_rect(&target);
        })
    }

    fn fill_rounded_rect(
        &mut self,
        rect: Rect,
        radius: f32,
        color: Color,
    ) -> SlidesmithResult<()> {
        if radius <= 0.0 {
            return self.fill_rect(rect, color, 1.0);
        }

        let radius = f64::from(radius)
            .min(f64::from(rect.width) / 2.0)
            .min(f64::from(rect.height) / 2.0);
        let rounded = kurbo::RoundedRect::from_rect(
            kurbo::Rect::new(
                f64::from(rect.x),
                f64::from(rect.y),
                f64::from(rect.x + rect.width),
                f64::from(rect.y + rect.height),
            ),
            radius,
        );
        let path = bezpath_to_cpu(&kurbo::Shape::to_path(&rounded, 0.1));
        let fill = to_peniko_color(color);

        self.paint_ops(move |ctx| {
            ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.set_paint(fill);
            ctx.fill_path(&path);
        })
    }

    fn font_ready(&mut self, font: &TextFont) -> bool {
        self.font_data
            .contains_key(&Self::first_family(&font.stack).to_lowercase())
    }

    fn fill_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        paint: &TextPaint,
    ) -> SlidesmithResult<()> {
        if text.is_empty() {
            return Ok(());
        }
        let Some(font_data) = self.resolve_font_data(&paint.font) else {
            return Ok(());
        };
        let layout = self.shape(text, &paint.font, paint.color);

        // A blurred shadow needs its own rasterization pass; a hard shadow is
        // just the same glyphs drawn offset, under the foreground.
        let mut direct_shadow = None;
        if let Some(shadow) = paint.shadow {
            let sx = x + shadow.offset_x;
            let sy = y + shadow.offset_y;
            if shadow.blur > 0.0 {
                let raster = self.rasterize_layout(&layout, &font_data, sx, sy, shadow.color);
                let blurred =
                    blur::shadow_blur_premul(&raster, self.width, self.height, shadow.blur)?;
                composite::over_in_place(&mut self.pixels, &blurred, 1.0)?;
            } else {
                direct_shadow = Some((sx, sy, shadow.color));
            }
        }

        let color = paint.color;
        self.paint_ops(move |ctx| {
            if let Some((sx, sy, shadow_color)) = direct_shadow {
                encode_layout(ctx, &layout, &font_data, sx, sy, shadow_color);
            }
            encode_layout(ctx, &layout, &font_data, x, y, color);
        })
    }

    fn frame(&self) -> Frame {
        Frame {
            width: self.width,
            height: self.height,
            data: self.pixels.clone(),
            premultiplied: true,
        }
    }
}

fn to_peniko_color(c: Color) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

fn to_kurbo_rect(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(
        f64::from(r.x),
        f64::from(r.y),
        f64::from(r.x + r.width),
        f64::from(r.y + r.height),
    )
}

fn bezpath_to_cpu(path: &kurbo::BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let point = |p: kurbo::Point| vello_cpu::kurbo::Point::new(p.x, p.y);
    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point(p)),
            PathEl::LineTo(p) => out.line_to(point(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point(p1), point(p2)),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(point(p1), point(p2), point(p3)),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn image_paint_from_premul(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> SlidesmithResult<vello_cpu::Image> {
    let w: u16 = width
        .try_into()
        .map_err(|_| SlidesmithError::render("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| SlidesmithError::render("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(SlidesmithError::render("prepared image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    let pixmap = vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, may_have_opacities);
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}
