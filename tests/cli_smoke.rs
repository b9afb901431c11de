use std::{io::Cursor, path::PathBuf};

use slidesmith::{Deck, ImageRef, Slide};

#[test]
fn cli_render_writes_pngs() {
    let dir = PathBuf::from("target").join("cli_smoke");
    std::fs::create_dir_all(&dir).unwrap();

    let bg_path = dir.join("bg.png");
    let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([30, 60, 90, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    std::fs::write(&bg_path, buf).unwrap();

    let mut slide = Slide::new("s1", "city at night", "Hello", "World");
    slide.image = Some(ImageRef::path("bg.png"));
    let deck = Deck::new(vec![slide]);

    let deck_path = dir.join("deck.json");
    let f = std::fs::File::create(&deck_path).unwrap();
    serde_json::to_writer_pretty(f, &deck).unwrap();

    let out_dir = dir.join("out");
    let out_png = out_dir.join("deck-1.png");
    let _ = std::fs::remove_file(&out_png);

    let exe = std::env::var_os("CARGO_BIN_EXE_slidesmith")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "slidesmith.exe"
            } else {
                "slidesmith"
            });
            p
        });

    let deck_arg = deck_path.to_string_lossy().to_string();
    let out_arg = out_dir.to_string_lossy().to_string();

    let status = std::process::Command::new(exe)
        .args(["render", "--deck", deck_arg.as_str(), "--out-dir"])
        .arg(out_arg.as_str())
        .status()
        .unwrap();

    assert!(status.success());
    assert!(out_png.exists());

    let decoded = image::open(&out_png).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (1080, 1080));
}
