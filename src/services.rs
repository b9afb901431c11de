use crate::{
    assets::ImageRef,
    compose::AspectRatio,
    error::{SlidesmithError, SlidesmithResult},
    slide::Slide,
};

/// One slide as proposed by the content planner.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SlidePlan {
    pub image_prompt: String,
    pub title: String,
    pub body: String,
}

/// Turns a free-text prompt into an ordered list of slide plans.
pub trait ContentPlanner {
    fn plan(
        &mut self,
        image_style: Option<&str>,
        content_prompt: &str,
    ) -> SlidesmithResult<Vec<SlidePlan>>;
}

/// Where slide backgrounds come from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSourceMode {
    #[default]
    Generate,
    Stock,
}

/// Resolves a slide's background image, by generation or stock search.
/// `ratio` is the request-side ratio string (see
/// [`AspectRatio::image_request_ratio`]).
pub trait ImageResolver {
    fn generate(&mut self, prompt: &str, ratio: &str) -> SlidesmithResult<ImageRef>;
    fn search_stock(&mut self, query: &str, ratio: &str) -> SlidesmithResult<Vec<ImageRef>>;
}

fn resolve_image(
    resolver: &mut dyn ImageResolver,
    mode: ImageSourceMode,
    prompt: &str,
    aspect: AspectRatio,
) -> SlidesmithResult<ImageRef> {
    let ratio = aspect.image_request_ratio();
    match mode {
        ImageSourceMode::Generate => resolver.generate(prompt, ratio),
        ImageSourceMode::Stock => resolver
            .search_stock(prompt, ratio)?
            .into_iter()
            .next()
            .ok_or_else(|| SlidesmithError::upstream("stock search returned no results", true)),
    }
}

/// Plan a whole deck: planner first, then one image per planned slide.
///
/// An empty prompt fails immediately, before any upstream call. Any image
/// resolution failure fails the entire batch; the slide texts are already
/// final at that point and a partially-imaged carousel would be
/// inconsistent.
pub fn plan_deck(
    planner: &mut dyn ContentPlanner,
    resolver: &mut dyn ImageResolver,
    mode: ImageSourceMode,
    image_style: Option<&str>,
    content_prompt: &str,
    aspect: AspectRatio,
) -> SlidesmithResult<Vec<Slide>> {
    if content_prompt.trim().is_empty() {
        return Err(SlidesmithError::validation(
            "content prompt must be non-empty",
        ));
    }

    let plans = planner.plan(image_style, content_prompt)?;
    if plans.is_empty() {
        return Err(SlidesmithError::upstream(
            "content planner returned no slides",
            true,
        ));
    }

    let mut slides = Vec::with_capacity(plans.len());
    for (i, plan) in plans.into_iter().enumerate() {
        let image = resolve_image(resolver, mode, &plan.image_prompt, aspect)?;
        let mut slide = Slide::new(
            format!("slide-{}", i + 1),
            plan.image_prompt,
            plan.title,
            plan.body,
        );
        slide.image = Some(image);
        slides.push(slide);
    }
    Ok(slides)
}

/// Re-resolve one slide's background from its kept prompt.
///
/// Runs through the slide's regeneration ticket, so a response landing after
/// a newer request started is discarded. Returns whether the outcome was
/// applied.
pub fn regenerate_image(
    slide: &mut Slide,
    resolver: &mut dyn ImageResolver,
    mode: ImageSourceMode,
    aspect: AspectRatio,
) -> bool {
    let ticket = slide.begin_regeneration();
    let prompt = slide.image_prompt.clone();
    let outcome = resolve_image(resolver, mode, &prompt, aspect);
    slide.complete_regeneration(ticket, outcome)
}
