use std::io::Cursor;

use slidesmith::{
    AspectRatio, Color, CompositeParams, CpuSurfaceProvider, FontLibrary, ImageRef, ImageStore,
    OverlaySpec, Slide, composite,
};

fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn digest_u64(bytes: &[u8]) -> u64 {
    let mut state = 0x9E37_79B9_7F4A_7C15u64;
    for chunk in bytes.chunks(8) {
        let mut v = 0u64;
        for (i, &b) in chunk.iter().enumerate() {
            v |= (b as u64) << (i * 8);
        }
        state = mix64(state ^ v);
    }
    state
}

fn png_bytes(r: u8, g: u8, b: u8) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([r, g, b, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn store_with_background() -> (ImageStore, ImageRef) {
    let mut store = ImageStore::new(".");
    let background = store.insert_memory("bg", png_bytes(40, 80, 120));
    (store, background)
}

fn slide(background: ImageRef) -> Slide {
    let mut slide = Slide::new("s1", "city at night", "Hello *World*", "Body text");
    slide.image = Some(background);
    slide
}

fn params() -> CompositeParams {
    CompositeParams {
        logo: None,
        logo_size_percent: 12.0,
        overlay: OverlaySpec {
            enabled: true,
            color: Color::BLACK,
            opacity: 0.3,
        },
        aspect_ratio: AspectRatio::Square,
        preview_width: 540.0,
    }
}

#[test]
fn cpu_composite_is_deterministic_and_nonempty() {
    let (mut store, background) = store_with_background();
    let slide = slide(background);
    let params = params();

    let mut provider = CpuSurfaceProvider::new(FontLibrary::new());
    let a = composite(&slide, &params, &mut store, &mut provider)
        .unwrap()
        .expect("surface");
    let b = composite(&slide, &params, &mut store, &mut provider)
        .unwrap()
        .expect("surface");

    let fa = a.frame();
    let fb = b.frame();
    assert_eq!(fa.width, 1080);
    assert_eq!(fa.height, 1080);
    assert!(fa.premultiplied);
    assert_eq!(digest_u64(&fa.data), digest_u64(&fb.data));
    assert!(fa.data.iter().any(|&x| x != 0));
}

#[test]
fn overlay_darkens_the_background() {
    let (mut store, background) = store_with_background();
    let slide = slide(background);

    let mut clear = params();
    clear.overlay.enabled = false;

    let mut provider = CpuSurfaceProvider::new(FontLibrary::new());
    let tinted = composite(&slide, &params(), &mut store, &mut provider)
        .unwrap()
        .expect("surface")
        .frame();
    let plain = composite(&slide, &clear, &mut store, &mut provider)
        .unwrap()
        .expect("surface")
        .frame();

    // Compare one background pixel away from any text area.
    let idx = ((10 * 1080 + 10) * 4) as usize;
    assert_eq!(&plain.data[idx..idx + 3], &[40, 80, 120]);
    assert!(tinted.data[idx] < plain.data[idx]);
    assert!(tinted.data[idx + 2] < plain.data[idx + 2]);
}

#[test]
fn missing_background_file_still_produces_a_surface() {
    let mut store = ImageStore::new(".");
    let mut s = Slide::new("s1", "prompt", "Hello", "Body");
    s.image = Some(ImageRef::path("does-not-exist.png"));

    let mut provider = CpuSurfaceProvider::new(FontLibrary::new());
    let out = composite(&s, &params(), &mut store, &mut provider).unwrap();
    let frame = out.expect("surface").frame();

    // Overlay still paints over the blank canvas.
    assert!(frame.data.iter().any(|&x| x != 0));
}
