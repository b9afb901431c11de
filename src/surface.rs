use crate::{
    assets::PreparedImage,
    error::SlidesmithResult,
    layout::{TextFont, TextMeasurer},
    render::Frame,
    style::{Color, ShadowSpec},
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Resolved shadow parameters at target scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowPaint {
    pub color: Color,
    pub blur: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl ShadowPaint {
    pub fn from_spec(spec: &ShadowSpec) -> Option<Self> {
        spec.enabled.then(|| Self {
            color: spec.color,
            blur: spec.blur.max(0.0),
            offset_x: spec.offset_x,
            offset_y: spec.offset_y,
        })
    }
}

/// Complete paint state for one text draw. Passed explicitly per call, so no
/// fill/shadow state can leak from one draw into the next.
#[derive(Clone, Debug, PartialEq)]
pub struct TextPaint {
    pub font: TextFont,
    pub color: Color,
    pub shadow: Option<ShadowPaint>,
}

/// Drawing capability the compositor renders through. Text measurement lives
/// on the same object as text painting so both resolve fonts identically.
pub trait DrawSurface: TextMeasurer {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Draw `image` stretched to cover `dest` exactly (no letterboxing).
    fn draw_image(&mut self, image: &PreparedImage, dest: Rect) -> SlidesmithResult<()>;

    /// Source-over fill of `rect` with `color` at `opacity` (0..=1).
    fn fill_rect(&mut self, rect: Rect, color: Color, opacity: f32) -> SlidesmithResult<()>;

    /// Fill a rounded rectangle; a non-positive `radius` falls back to a
    /// plain rectangle.
    fn fill_rounded_rect(&mut self, rect: Rect, radius: f32, color: Color)
    -> SlidesmithResult<()>;

    /// Best-effort readiness check for `font`. A false return must not stop
    /// a render; callers log and continue.
    fn font_ready(&mut self, font: &TextFont) -> bool;

    /// Draw `text` with the top-left corner of its em box at `(x, y)`.
    fn fill_text(&mut self, text: &str, x: f32, y: f32, paint: &TextPaint)
    -> SlidesmithResult<()>;

    /// Read back the surface pixels.
    fn frame(&self) -> Frame;
}

/// Creates fixed-size surfaces for the compositor.
pub trait SurfaceProvider {
    fn create_surface(&mut self, width: u32, height: u32)
    -> SlidesmithResult<Box<dyn DrawSurface>>;
}
