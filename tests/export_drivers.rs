use std::{
    io::Cursor,
    sync::{Arc, Mutex},
};

use slidesmith::{
    Color, Deck, DrawSurface, Frame, ImageLoader, ImageRef, PreparedImage, Rect, Slide,
    SlidesmithResult, SurfaceProvider, TextFont, TextMeasurer, TextPaint, export_pdf, export_zip,
    render_deck_pngs,
};

/// Surface that renders nothing but yields a tiny valid frame, so driver
/// tests stay fast and font-free.
struct BlankSurface {
    width: u32,
    height: u32,
}

impl TextMeasurer for BlankSurface {
    fn measure_text(&mut self, text: &str, font: &TextFont) -> f32 {
        text.chars().count() as f32 * font.size * 0.5
    }
}

impl DrawSurface for BlankSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn draw_image(&mut self, _image: &PreparedImage, _dest: Rect) -> SlidesmithResult<()> {
        Ok(())
    }

    fn fill_rect(&mut self, _rect: Rect, _color: Color, _opacity: f32) -> SlidesmithResult<()> {
        Ok(())
    }

    fn fill_rounded_rect(
        &mut self,
        _rect: Rect,
        _radius: f32,
        _color: Color,
    ) -> SlidesmithResult<()> {
        Ok(())
    }

    fn font_ready(&mut self, _font: &TextFont) -> bool {
        true
    }

    fn fill_text(
        &mut self,
        _text: &str,
        _x: f32,
        _y: f32,
        _paint: &TextPaint,
    ) -> SlidesmithResult<()> {
        Ok(())
    }

    fn frame(&self) -> Frame {
        // Drivers only need encodable pixels, not the full canvas.
        Frame {
            width: 8,
            height: 8,
            data: vec![128; 8 * 8 * 4],
            premultiplied: true,
        }
    }
}

#[derive(Default)]
struct BlankProvider {
    created: Arc<Mutex<Vec<(u32, u32)>>>,
}

impl SurfaceProvider for BlankProvider {
    fn create_surface(
        &mut self,
        width: u32,
        height: u32,
    ) -> SlidesmithResult<Box<dyn DrawSurface>> {
        self.created.lock().unwrap().push((width, height));
        Ok(Box::new(BlankSurface { width, height }))
    }
}

#[derive(Default)]
struct SolidLoader;

impl ImageLoader for SolidLoader {
    fn load(&mut self, _image: &ImageRef) -> SlidesmithResult<Arc<PreparedImage>> {
        Ok(Arc::new(PreparedImage {
            width: 2,
            height: 2,
            rgba8_premul: Arc::new(vec![255; 16]),
        }))
    }
}

fn deck(n: usize, with_images: bool) -> Deck {
    let slides = (0..n)
        .map(|i| {
            let mut slide = Slide::new(format!("s{i}"), "prompt", "Title", "Body");
            if with_images {
                slide.image = Some(ImageRef::memory("bg"));
            }
            slide
        })
        .collect();
    Deck::new(slides)
}

#[test]
fn deck_pngs_are_named_with_one_based_indices() {
    let mut provider = BlankProvider::default();
    let mut loader = SolidLoader;
    let pages =
        render_deck_pngs(&deck(3, true), "Summer Sale!", 540.0, &mut loader, &mut provider)
            .unwrap();

    let names: Vec<&str> = pages.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Summer-Sale-1.png", "Summer-Sale-2.png", "Summer-Sale-3.png"]
    );
    for (_, png) in &pages {
        let decoded = image::load_from_memory(png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 8));
    }
}

#[test]
fn imageless_slides_are_skipped_and_keep_their_index() {
    let mut d = deck(3, true);
    d.slides[1].image = None;

    let mut provider = BlankProvider::default();
    let mut loader = SolidLoader;
    let pages = render_deck_pngs(&d, "deck", 540.0, &mut loader, &mut provider).unwrap();

    let names: Vec<&str> = pages.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["deck-1.png", "deck-3.png"]);
}

#[test]
fn zip_archive_contains_one_entry_per_rendered_slide() {
    let mut provider = BlankProvider::default();
    let mut loader = SolidLoader;
    let bytes = export_zip(&deck(2, true), "My Deck", 540.0, &mut loader, &mut provider).unwrap();

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["My-Deck-1.png", "My-Deck-2.png"]);
}

#[test]
fn zip_of_an_unrenderable_deck_is_an_error() {
    let mut provider = BlankProvider::default();
    let mut loader = SolidLoader;
    let err = export_zip(&deck(2, false), "deck", 540.0, &mut loader, &mut provider).unwrap_err();
    assert!(err.to_string().contains("no renderable slides"));
}

#[test]
fn pdf_export_renders_at_the_fixed_reference_width() {
    let mut provider = BlankProvider::default();
    let created = provider.created.clone();
    let mut loader = SolidLoader;
    let bytes = export_pdf(&deck(2, true), "My Deck", &mut loader, &mut provider).unwrap();

    assert!(bytes.starts_with(b"%PDF"));
    // Reference width 1080 -> scale 1 against the square canvas.
    assert_eq!(created.lock().unwrap().as_slice(), &[(1080, 1080), (1080, 1080)]);
}

#[test]
fn batch_composites_slides_sequentially_in_deck_order() {
    let mut provider = BlankProvider::default();
    let created = provider.created.clone();
    let mut loader = SolidLoader;

    let mut d = deck(3, true);
    d.aspect_ratio = slidesmith::AspectRatio::Portrait;
    render_deck_pngs(&d, "deck", 540.0, &mut loader, &mut provider).unwrap();

    assert_eq!(
        created.lock().unwrap().as_slice(),
        &[(1080, 1440), (1080, 1440), (1080, 1440)]
    );
}
