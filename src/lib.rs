#![forbid(unsafe_code)]

pub mod assets;
pub mod compose;
pub mod error;
pub mod export;
pub mod layout;
pub mod markup;
pub mod render;
pub mod services;
pub mod slide;
pub mod style;
pub mod surface;

pub use assets::{ImageLoader, ImageRef, ImageStore, PreparedImage};
pub use compose::{AspectRatio, CompositeParams, OUTPUT_WIDTH, composite};
pub use error::{SlidesmithError, SlidesmithResult};
pub use export::{encode_png, export_pdf, export_zip, render_deck_pngs, render_slide_png};
pub use layout::{Fragment, LINE_HEIGHT_FACTOR, Line, TextBlock, TextFont, TextMeasurer, wrap};
pub use markup::Run;
pub use render::Frame;
pub use render::cpu::{CpuSurface, CpuSurfaceProvider, FontLibrary};
pub use services::{
    ContentPlanner, ImageResolver, ImageSourceMode, SlidePlan, plan_deck, regenerate_image,
};
pub use slide::{Deck, RegenTicket, Slide, SlideTheme, StylePreset, apply_preset};
pub use style::{
    Color, CtaSpec, FontSpec, HorizontalAlign, LayoutSpec, OverlaySpec, PillSpec, ShadowSpec,
    StyleSpec, VerticalAlign,
};
pub use surface::{DrawSurface, Rect, ShadowPaint, SurfaceProvider, TextPaint};
