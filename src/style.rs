use crate::error::{SlidesmithError, SlidesmithResult};

/// RGBA color, serialized as a `#RRGGBB` / `#RRGGBBAA` hex string.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA`.
    pub fn from_hex(s: &str) -> SlidesmithResult<Self> {
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| SlidesmithError::validation(format!("color '{s}' must start with #")))?;

        let nibble = |c: u8| -> SlidesmithResult<u8> {
            (c as char)
                .to_digit(16)
                .map(|d| d as u8)
                .ok_or_else(|| SlidesmithError::validation(format!("color '{s}' is not valid hex")))
        };
        let byte = |hi: u8, lo: u8| -> SlidesmithResult<u8> { Ok(nibble(hi)? << 4 | nibble(lo)?) };

        let b = hex.as_bytes();
        match b.len() {
            3 => Ok(Self::rgb(
                byte(b[0], b[0])?,
                byte(b[1], b[1])?,
                byte(b[2], b[2])?,
            )),
            6 => Ok(Self::rgb(
                byte(b[0], b[1])?,
                byte(b[2], b[3])?,
                byte(b[4], b[5])?,
            )),
            8 => Ok(Self::rgba(
                byte(b[0], b[1])?,
                byte(b[2], b[3])?,
                byte(b[4], b[5])?,
                byte(b[6], b[7])?,
            )),
            _ => Err(SlidesmithError::validation(format!(
                "color '{s}' must be #RGB, #RRGGBB or #RRGGBBAA"
            ))),
        }
    }

    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }

    /// Same color with its alpha multiplied by `opacity` (0..=1).
    pub fn with_opacity(self, opacity: f32) -> Self {
        let a = (f32::from(self.a) * opacity.clamp(0.0, 1.0)).round() as u8;
        Self { a, ..self }
    }
}

impl TryFrom<String> for Color {
    type Error = SlidesmithError;

    fn try_from(s: String) -> SlidesmithResult<Self> {
        Self::from_hex(&s)
    }
}

impl From<Color> for String {
    fn from(c: Color) -> String {
        c.to_hex()
    }
}

/// Font selection for one text block: a family name plus a generic fallback.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FontSpec {
    pub family: String,
    #[serde(default = "FontSpec::default_fallback")]
    pub fallback: String,
}

impl FontSpec {
    fn default_fallback() -> String {
        "sans-serif".to_string()
    }

    /// CSS-style font stack used for shaping and painting alike.
    pub fn stack(&self) -> String {
        format!("{}, {}", self.family, self.fallback)
    }
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: "Inter".to_string(),
            fallback: Self::default_fallback(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalAlign {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlign {
    Top,
    #[default]
    Center,
    Bottom,
}

/// Drop shadow behind a text block. All lengths are in the same
/// device-independent units as the font size and scale with it.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ShadowSpec {
    pub enabled: bool,
    pub color: Color,
    pub blur: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl ShadowSpec {
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            enabled: self.enabled,
            color: self.color,
            blur: self.blur * factor,
            offset_x: self.offset_x * factor,
            offset_y: self.offset_y * factor,
        }
    }
}

impl Default for ShadowSpec {
    fn default() -> Self {
        Self {
            enabled: false,
            color: Color::rgba(0, 0, 0, 160),
            blur: 8.0,
            offset_x: 0.0,
            offset_y: 2.0,
        }
    }
}

/// Per-block text styling at preview scale.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StyleSpec {
    pub font_size: f32,
    pub color: Color,
    pub font: FontSpec,
    #[serde(default)]
    pub align: HorizontalAlign,
    #[serde(default = "StyleSpec::default_highlight")]
    pub highlight_color: Color,
    #[serde(default)]
    pub shadow: ShadowSpec,
}

impl StyleSpec {
    fn default_highlight() -> Color {
        Color::rgb(0xFF, 0xD7, 0x00)
    }

    /// Rescale every length-valued field by `factor`. Colors, alignment and
    /// the font family carry over unchanged; scaling composes
    /// multiplicatively, so `scaled(f1).scaled(f2) == scaled(f1 * f2)`.
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            font_size: self.font_size * factor,
            color: self.color,
            font: self.font.clone(),
            align: self.align,
            highlight_color: self.highlight_color,
            shadow: self.shadow.scaled(factor),
        }
    }

    pub fn validate(&self, block: &str) -> SlidesmithResult<()> {
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(SlidesmithError::validation(format!(
                "{block} font size must be finite and > 0"
            )));
        }
        if self.font.family.trim().is_empty() {
            return Err(SlidesmithError::validation(format!(
                "{block} font family must be non-empty"
            )));
        }
        Ok(())
    }
}

impl Default for StyleSpec {
    fn default() -> Self {
        Self {
            font_size: 32.0,
            color: Color::WHITE,
            font: FontSpec::default(),
            align: HorizontalAlign::Center,
            highlight_color: Self::default_highlight(),
            shadow: ShadowSpec::default(),
        }
    }
}

/// Placement of the stacked title/body/CTA group within the canvas.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LayoutSpec {
    #[serde(default)]
    pub vertical_align: VerticalAlign,
    /// Gap between the title block and the body block, at preview scale.
    pub block_spacing: f32,
}

impl Default for LayoutSpec {
    fn default() -> Self {
        Self {
            vertical_align: VerticalAlign::Center,
            block_spacing: 16.0,
        }
    }
}

/// Rounded-rectangle background behind the CTA text. All lengths scale with
/// the font size.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PillSpec {
    pub color: Color,
    pub corner_radius: f32,
    pub padding_x: f32,
    pub padding_y: f32,
}

impl PillSpec {
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            color: self.color,
            corner_radius: self.corner_radius * factor,
            padding_x: self.padding_x * factor,
            padding_y: self.padding_y * factor,
        }
    }
}

impl Default for PillSpec {
    fn default() -> Self {
        Self {
            color: Color::rgb(0xFF, 0xD7, 0x00),
            corner_radius: 12.0,
            padding_x: 24.0,
            padding_y: 12.0,
        }
    }
}

/// Optional call-to-action block rendered below the body text.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CtaSpec {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub text: String,
    #[serde(default = "CtaSpec::default_style")]
    pub style: StyleSpec,
    #[serde(default)]
    pub background: PillSpec,
}

impl CtaSpec {
    fn default_style() -> StyleSpec {
        StyleSpec {
            font_size: 20.0,
            color: Color::BLACK,
            ..StyleSpec::default()
        }
    }

    /// A CTA only takes part in layout when enabled with non-blank text.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.text.trim().is_empty()
    }
}

/// Full-canvas tint drawn over the background image.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OverlaySpec {
    pub enabled: bool,
    pub color: Color,
    /// 0..=1.
    pub opacity: f32,
}

impl OverlaySpec {
    pub fn validate(&self) -> SlidesmithResult<()> {
        if !self.opacity.is_finite() || !(0.0..=1.0).contains(&self.opacity) {
            return Err(SlidesmithError::validation(
                "overlay opacity must be within 0..=1",
            ));
        }
        Ok(())
    }
}

impl Default for OverlaySpec {
    fn default() -> Self {
        Self {
            enabled: false,
            color: Color::BLACK,
            opacity: 0.3,
        }
    }
}
