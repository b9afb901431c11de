use crate::{
    assets::ImageRef,
    compose::AspectRatio,
    error::{SlidesmithError, SlidesmithResult},
    style::{CtaSpec, LayoutSpec, OverlaySpec, StyleSpec},
};

/// One carousel slide: its text, its styling, and the state of its
/// background image.
///
/// `image_prompt` is kept after the image resolves so the slide can be
/// regenerated later. While a regeneration is in flight `loading` is true
/// and a stale `image` may still be present.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Slide {
    pub id: String,
    pub image_prompt: String,
    #[serde(default)]
    pub image: Option<ImageRef>,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub loading: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default = "Slide::default_title_style")]
    pub title_style: StyleSpec,
    #[serde(default)]
    pub body_style: StyleSpec,
    #[serde(default)]
    pub layout: LayoutSpec,
    #[serde(default)]
    pub cta: CtaSpec,
    /// Monotonic regeneration sequence; stale completions are discarded.
    #[serde(skip)]
    regen_seq: u64,
}

/// Handle for one in-flight image regeneration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegenTicket {
    seq: u64,
}

impl Slide {
    fn default_title_style() -> StyleSpec {
        StyleSpec {
            font_size: 48.0,
            ..StyleSpec::default()
        }
    }

    pub fn new(
        id: impl Into<String>,
        image_prompt: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            image_prompt: image_prompt.into(),
            image: None,
            title: title.into(),
            body: body.into(),
            loading: false,
            error: None,
            title_style: Self::default_title_style(),
            body_style: StyleSpec::default(),
            layout: LayoutSpec::default(),
            cta: CtaSpec::default(),
            regen_seq: 0,
        }
    }

    pub fn with_title(&self, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..self.clone()
        }
    }

    pub fn with_body(&self, body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..self.clone()
        }
    }

    pub fn with_title_style(&self, style: StyleSpec) -> Self {
        Self {
            title_style: style,
            ..self.clone()
        }
    }

    pub fn with_body_style(&self, style: StyleSpec) -> Self {
        Self {
            body_style: style,
            ..self.clone()
        }
    }

    pub fn with_layout(&self, layout: LayoutSpec) -> Self {
        Self {
            layout,
            ..self.clone()
        }
    }

    pub fn with_cta(&self, cta: CtaSpec) -> Self {
        Self {
            cta,
            ..self.clone()
        }
    }

    /// Mark the slide as regenerating and hand out a ticket for the
    /// in-flight request. Starting a new regeneration invalidates every
    /// earlier ticket, so the last request wins deterministically.
    pub fn begin_regeneration(&mut self) -> RegenTicket {
        self.regen_seq += 1;
        self.loading = true;
        self.error = None;
        RegenTicket {
            seq: self.regen_seq,
        }
    }

    /// Apply the outcome of a regeneration. Returns false (and changes
    /// nothing) when the ticket is stale.
    pub fn complete_regeneration(
        &mut self,
        ticket: RegenTicket,
        outcome: SlidesmithResult<ImageRef>,
    ) -> bool {
        if ticket.seq != self.regen_seq {
            return false;
        }
        self.loading = false;
        match outcome {
            Ok(image) => {
                self.image = Some(image);
                self.error = None;
            }
            Err(err) => {
                self.error = Some(err.to_string());
            }
        }
        true
    }

    pub fn validate(&self) -> SlidesmithResult<()> {
        if self.id.trim().is_empty() {
            return Err(SlidesmithError::validation("slide id must be non-empty"));
        }
        self.title_style.validate("title")?;
        self.body_style.validate("body")?;
        self.cta.style.validate("cta")?;
        Ok(())
    }
}

/// Style bundle applied to a whole slide at once.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SlideTheme {
    pub title_style: StyleSpec,
    pub body_style: StyleSpec,
    pub layout: LayoutSpec,
    pub cta: CtaSpec,
}

impl SlideTheme {
    pub fn of(slide: &Slide) -> Self {
        Self {
            title_style: slide.title_style.clone(),
            body_style: slide.body_style.clone(),
            layout: slide.layout,
            cta: slide.cta.clone(),
        }
    }
}

/// Named, persisted style snapshot. Captured by value, so later slide edits
/// never reach back into a saved preset.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StylePreset {
    pub name: String,
    #[serde(default)]
    pub logo: Option<ImageRef>,
    pub base: SlideTheme,
    /// Distinct bundle for the final slide, when set.
    #[serde(default)]
    pub terminal: Option<SlideTheme>,
}

impl StylePreset {
    pub fn capture(
        name: impl Into<String>,
        logo: Option<ImageRef>,
        base: &Slide,
        terminal: Option<&Slide>,
    ) -> Self {
        Self {
            name: name.into(),
            logo,
            base: SlideTheme::of(base),
            terminal: terminal.map(SlideTheme::of),
        }
    }
}

/// Apply a preset across a deck: every non-terminal slide receives the base
/// theme, the final slide receives the terminal theme when one exists.
/// Returns new slides; the inputs are untouched.
pub fn apply_preset(slides: &[Slide], preset: &StylePreset) -> Vec<Slide> {
    let last = slides.len().saturating_sub(1);
    slides
        .iter()
        .enumerate()
        .map(|(i, slide)| {
            let theme = match (&preset.terminal, i == last) {
                (Some(terminal), true) => terminal,
                _ => &preset.base,
            };
            Slide {
                title_style: theme.title_style.clone(),
                body_style: theme.body_style.clone(),
                layout: theme.layout,
                cta: theme.cta.clone(),
                ..slide.clone()
            }
        })
        .collect()
}

/// A whole carousel plus the compositor parameters shared by its slides.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Deck {
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    #[serde(default)]
    pub logo: Option<ImageRef>,
    #[serde(default = "Deck::default_logo_size")]
    pub logo_size_percent: f32,
    #[serde(default)]
    pub overlay: OverlaySpec,
    pub slides: Vec<Slide>,
}

impl Deck {
    fn default_logo_size() -> f32 {
        12.0
    }

    pub fn new(slides: Vec<Slide>) -> Self {
        Self {
            aspect_ratio: AspectRatio::default(),
            logo: None,
            logo_size_percent: Self::default_logo_size(),
            overlay: OverlaySpec::default(),
            slides,
        }
    }

    pub fn validate(&self) -> SlidesmithResult<()> {
        if self.slides.is_empty() {
            return Err(SlidesmithError::validation(
                "deck must contain at least one slide",
            ));
        }
        if !self.logo_size_percent.is_finite()
            || self.logo_size_percent <= 0.0
            || self.logo_size_percent > 100.0
        {
            return Err(SlidesmithError::validation(
                "logo size percent must be within 0..=100",
            ));
        }
        self.overlay.validate()?;

        let mut seen = std::collections::BTreeSet::new();
        for slide in &self.slides {
            slide.validate()?;
            if !seen.insert(slide.id.as_str()) {
                return Err(SlidesmithError::validation(format!(
                    "duplicate slide id '{}'",
                    slide.id
                )));
            }
        }
        Ok(())
    }
}
