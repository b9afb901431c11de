use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "slidesmith", version)]
struct Cli {
    /// Log rendering diagnostics to stderr.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render every slide to a PNG file in a directory.
    Render(RenderArgs),
    /// Render every slide and bundle the PNGs into a zip archive.
    Zip(ZipArgs),
    /// Render every slide into a paginated PDF, one full-bleed page each.
    Pdf(PdfArgs),
}

#[derive(Args, Debug)]
struct DeckArgs {
    /// Input deck JSON. Image paths resolve relative to this file.
    #[arg(long = "deck")]
    deck_path: PathBuf,

    /// Directory of .ttf/.otf fonts to register for text rendering.
    #[arg(long)]
    fonts: Option<PathBuf>,

    /// Base name for output files (defaults to the deck file stem).
    #[arg(long)]
    name: Option<String>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    deck: DeckArgs,

    /// Output directory for the PNGs.
    #[arg(long)]
    out_dir: PathBuf,

    /// Width of the on-screen preview the styles were authored against.
    #[arg(long, default_value_t = 540.0)]
    preview_width: f32,
}

#[derive(Parser, Debug)]
struct ZipArgs {
    #[command(flatten)]
    deck: DeckArgs,

    /// Output zip path.
    #[arg(long)]
    out: PathBuf,

    /// Width of the on-screen preview the styles were authored against.
    #[arg(long, default_value_t = 540.0)]
    preview_width: f32,
}

#[derive(Parser, Debug)]
struct PdfArgs {
    #[command(flatten)]
    deck: DeckArgs,

    /// Output PDF path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.verbose {
        let _ = tracing_subscriber::fmt()
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
    }

    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Zip(args) => cmd_zip(args),
        Command::Pdf(args) => cmd_pdf(args),
    }
}

fn read_deck_json(path: &Path) -> anyhow::Result<slidesmith::Deck> {
    let f = File::open(path).with_context(|| format!("open deck '{}'", path.display()))?;
    let r = BufReader::new(f);
    let deck: slidesmith::Deck = serde_json::from_reader(r).with_context(|| "parse deck JSON")?;
    Ok(deck)
}

struct Session {
    deck: slidesmith::Deck,
    name: String,
    images: slidesmith::ImageStore,
    surfaces: slidesmith::CpuSurfaceProvider,
}

fn open_session(args: &DeckArgs) -> anyhow::Result<Session> {
    let deck = read_deck_json(&args.deck_path)?;
    deck.validate()?;

    let mut fonts = slidesmith::FontLibrary::new();
    if let Some(dir) = &args.fonts {
        fonts.load_dir(dir)?;
    }
    if fonts.is_empty() {
        eprintln!("warning: no fonts registered; slide text will not be drawn");
    }

    let assets_root = args.deck_path.parent().unwrap_or_else(|| Path::new("."));
    let name = args.name.clone().unwrap_or_else(|| {
        args.deck_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "carousel".to_string())
    });

    Ok(Session {
        deck,
        name,
        images: slidesmith::ImageStore::new(assets_root),
        surfaces: slidesmith::CpuSurfaceProvider::new(fonts),
    })
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut session = open_session(&args.deck)?;
    let pages = slidesmith::render_deck_pngs(
        &session.deck,
        &session.name,
        args.preview_width,
        &mut session.images,
        &mut session.surfaces,
    )?;
    if pages.is_empty() {
        anyhow::bail!("deck has no renderable slides");
    }

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create output dir '{}'", args.out_dir.display()))?;
    for (file, png) in pages {
        let path = args.out_dir.join(file);
        std::fs::write(&path, png).with_context(|| format!("write '{}'", path.display()))?;
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

fn cmd_zip(args: ZipArgs) -> anyhow::Result<()> {
    let mut session = open_session(&args.deck)?;
    let archive = slidesmith::export_zip(
        &session.deck,
        &session.name,
        args.preview_width,
        &mut session.images,
        &mut session.surfaces,
    )?;

    write_output(&args.out, &archive)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_pdf(args: PdfArgs) -> anyhow::Result<()> {
    let mut session = open_session(&args.deck)?;
    let pdf = slidesmith::export_pdf(
        &session.deck,
        &session.name,
        &mut session.images,
        &mut session.surfaces,
    )?;

    write_output(&args.out, &pdf)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn write_output(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir '{}'", parent.display()))?;
        }
    }
    std::fs::write(path, bytes).with_context(|| format!("write '{}'", path.display()))
}
