//! kelpmark CLI tool
//!
//! A command-line tool for watermarking images and PDF pages with text.

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use glob::glob;
use log::{error, info, warn};

use kelpmark::dialogs::{Prompter, ScriptedPrompter};
use kelpmark::document::{decode_image, is_pdf_path};
use kelpmark::editor::{DirectoryPreviews, Editor, NoPreviews, PreviewSink};
use kelpmark::export::ExportFormat;
use kelpmark::font::FontBook;
use kelpmark::layout::scaled_dimensions;
use kelpmark::pdf::extract_metadata;
use kelpmark::pdf::import::{DEFAULT_DPI, MAX_DPI, MIN_DPI};
use kelpmark::{FontSpec, Rgb, StyleConfig};

/// kelpmark - Watermark images and PDF pages with text
#[derive(Parser)]
#[command(name = "kelpmark")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Stamp a rotated, half transparent word on a photo
    kelpmark mark photo.jpg -o marked.jpg --text \"SAMPLE\" --angle -30

    # Tile a scanned PDF rendered at 150 dpi and save it as a PDF
    kelpmark mark scan.pdf -o marked.pdf --dpi 150 --text \"COPY\" --tile --stagger

    # Mark several images at once (writes out-01.png, out-02.png, ...)
    kelpmark mark \"*.png\" -o out.png --text \"DRAFT\" --font \"bold 40pt Sans #cc0000\"

    # Write zoomed previews to a directory
    kelpmark preview photo.jpg --out-dir previews --zoom -2 --text \"SAMPLE\"")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watermark images or PDF pages and save the result
    Mark {
        /// Input images or PDFs (in order). Supports glob patterns like "*.png"
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output file; several images become numbered files unless it is a PDF
        #[arg(short, long)]
        output: PathBuf,

        /// Output kind used when the output name has no known extension
        #[arg(long, value_enum, default_value_t = FormatArg::Images)]
        format: FormatArg,

        #[command(flatten)]
        import: ImportArgs,

        #[command(flatten)]
        style: StyleArgs,

        /// Open the output file after creation
        #[arg(long)]
        open: bool,
    },

    /// Write watermarked previews, scaled by the zoom level
    Preview {
        /// Input images or PDFs (in order). Supports glob patterns like "*.png"
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Directory receiving preview-01.png, preview-02.png, ...
        #[arg(long)]
        out_dir: PathBuf,

        /// Zoom steps of 1.5x; negative values zoom out
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        zoom: i32,

        #[command(flatten)]
        import: ImportArgs,

        #[command(flatten)]
        style: StyleArgs,
    },

    /// Show dimensions of images, or page sizes of PDFs
    Info {
        /// Files to inspect
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Resolution used to compute raster sizes of PDF pages
        #[arg(long, default_value_t = DEFAULT_DPI)]
        dpi: u32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Images,
    Pdf,
}

impl From<FormatArg> for ExportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Images => ExportFormat::Images,
            FormatArg::Pdf => ExportFormat::Pdf,
        }
    }
}

#[derive(Args)]
struct ImportArgs {
    /// Resolution for rasterizing PDF pages (10-600)
    #[arg(long, default_value_t = DEFAULT_DPI, value_parser = clap::value_parser!(u32).range(MIN_DPI as i64..=MAX_DPI as i64))]
    dpi: u32,

    /// Directory containing the Pdfium library
    #[arg(long)]
    pdfium: Option<PathBuf>,

    /// Extra font file to make available by family name
    #[arg(long)]
    font_file: Option<PathBuf>,
}

#[derive(Args)]
struct StyleArgs {
    /// Watermark text (use \n for line breaks)
    #[arg(long, default_value = "")]
    text: String,

    /// Font specification
    /// Format: "[bold] [italic] [size[pt]] [family] [#rrggbb]"
    /// Example: "bold 40pt Liberation_Serif #333333"
    #[arg(long)]
    font: Option<String>,

    /// Font size in points (overrides --font)
    #[arg(long)]
    size: Option<f32>,

    /// Bold text
    #[arg(long)]
    bold: bool,

    /// Text color as #rrggbb (overrides --font)
    #[arg(long, value_parser = parse_color)]
    color: Option<Rgb>,

    /// Text opacity, 0 (invisible) to 255 (opaque)
    #[arg(long)]
    opacity: Option<u8>,

    /// Clockwise rotation in degrees
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    angle: f32,

    /// Repeat the text over the whole image
    #[arg(long)]
    tile: bool,

    /// Shift every other row of tiles by half a tile
    #[arg(long)]
    stagger: bool,

    /// Horizontal gap between tiles, in percent of a space
    #[arg(long)]
    h_spacing: Option<u32>,

    /// Vertical gap between tiles, in percent of a line
    #[arg(long)]
    v_spacing: Option<u32>,
}

impl StyleArgs {
    fn to_style(&self) -> StyleConfig {
        let mut style = StyleConfig {
            text: self.text.replace("\\n", "\n"),
            angle: self.angle,
            tiling: self.tile,
            staggered: self.stagger,
            ..StyleConfig::default()
        };

        if let Some(ref font) = self.font {
            style.apply_font(&FontSpec::parse(font));
        }
        if let Some(size) = self.size {
            style.font_size = size;
        }
        style.bold |= self.bold;
        if let Some(color) = self.color {
            style.color = color;
        }
        if let Some(opacity) = self.opacity {
            style.opacity = opacity;
        }
        if let Some(spacing) = self.h_spacing {
            style.h_spacing = spacing;
        }
        if let Some(spacing) = self.v_spacing {
            style.v_spacing = spacing;
        }

        style
    }
}

fn parse_color(s: &str) -> std::result::Result<Rgb, String> {
    Rgb::parse_hex(s).map_err(|e| e.to_string())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Mark { inputs, output, format, import, style, open } => {
            cmd_mark(inputs, output, format.into(), &import, &style, open)
        }
        Commands::Preview { inputs, out_dir, zoom, import, style } => {
            cmd_preview(inputs, out_dir, zoom, &import, &style)
        }
        Commands::Info { inputs, dpi } => cmd_info(&inputs, dpi),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        process::exit(1);
    }
}

/// Expand glob patterns in input paths, keeping argument order
fn expand_globs(patterns: Vec<String>) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        // Check if pattern contains glob characters
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            let mut matched: Vec<PathBuf> = Vec::new();
            let entries = glob(&pattern)
                .map_err(|e| kelpmark::Error::InvalidGlob(format!("{}: {}", pattern, e)))?;
            for entry in entries {
                match entry {
                    Ok(path) => matched.push(path),
                    Err(e) => warn!("glob error for {}: {}", pattern, e),
                }
            }
            if matched.is_empty() {
                return Err(kelpmark::Error::NoFilesMatched(pattern).into());
            }
            // Sort matches for consistent ordering
            matched.sort();
            paths.extend(matched);
        } else {
            // No glob characters, treat as literal path
            paths.push(PathBuf::from(pattern));
        }
    }

    Ok(paths)
}

/// Open a file with the system default application
fn open_file(path: &Path) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(path).spawn()?;
    }
    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(path).spawn()?;
    }
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", "", &path.display().to_string()])
            .spawn()?;
    }
    Ok(())
}

fn build_editor<S: PreviewSink>(import: &ImportArgs, style: &StyleArgs, sink: S) -> Result<Editor<S>> {
    let mut fonts = FontBook::system();
    if let Some(ref font_file) = import.font_file {
        fonts
            .add_font_file(font_file)
            .with_context(|| format!("Failed to load font file {}", font_file.display()))?;
    }

    let mut editor = Editor::new(style.to_style(), fonts, sink);
    if let Some(ref dir) = import.pdfium {
        editor = editor.with_pdfium_dir(dir);
    }
    Ok(editor)
}

/// Load every input, reporting failures without stopping at them
fn load_inputs<S: PreviewSink>(
    editor: &mut Editor<S>,
    inputs: &[PathBuf],
    prompter: &mut dyn Prompter,
) -> usize {
    let mut failures = 0;
    for path in inputs {
        if let Err(e) = editor.load_file(path, prompter) {
            error!("Failed to load {}: {}", path.display(), e);
            failures += 1;
        }
    }
    failures
}

/// Watermark the inputs and save them
fn cmd_mark(
    inputs: Vec<String>,
    output: PathBuf,
    format: ExportFormat,
    import: &ImportArgs,
    style: &StyleArgs,
    open: bool,
) -> Result<()> {
    let inputs = expand_globs(inputs)?;
    let mut editor = build_editor(import, style, NoPreviews)?;
    let mut prompter = ScriptedPrompter::new()
        .with_dpi(import.dpi)
        .with_save(output, format);

    info!("Loading {} files...", inputs.len());
    let failures = load_inputs(&mut editor, &inputs, &mut prompter);
    if editor.document().is_empty() {
        bail!("No images loaded ({} files failed)", failures);
    }

    let written = editor.save(&mut prompter).context("Failed to save")?;
    for path in &written {
        info!("Output: {}", path.display());
    }

    if open {
        if let Some(first) = written.first() {
            open_file(first)?;
        }
    }

    Ok(())
}

/// Render zoomed previews into a directory
fn cmd_preview(
    inputs: Vec<String>,
    out_dir: PathBuf,
    zoom: i32,
    import: &ImportArgs,
    style: &StyleArgs,
) -> Result<()> {
    let inputs = expand_globs(inputs)?;
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let mut editor = build_editor(import, style, DirectoryPreviews::new(&out_dir))?;
    let mut prompter = ScriptedPrompter::new().with_dpi(import.dpi);
    load_inputs(&mut editor, &inputs, &mut prompter);

    for _ in 0..zoom.unsigned_abs() {
        if zoom > 0 {
            editor.zoom_in()?;
        } else {
            editor.zoom_out()?;
        }
    }

    let count = editor.sink().files().count();
    info!(
        "Wrote {} previews to {} (zoom {:.3}x)",
        count,
        out_dir.display(),
        editor.style().zoom.factor()
    );
    Ok(())
}

/// Show information about images and PDFs
fn cmd_info(inputs: &[PathBuf], dpi: u32) -> Result<()> {
    for input in inputs {
        if !input.exists() {
            bail!("Input file not found: {}", input.display());
        }

        println!("File: {}", input.display());

        if is_pdf_path(input) {
            let metadata = extract_metadata(input)?;
            println!("Pages: {}", metadata.page_count());
            for (index, size) in metadata.page_sizes.iter().enumerate() {
                let (width, height) = scaled_dimensions(size.width, size.height, dpi);
                println!(
                    "  Page {}: {}x{} pt, {}x{} px at {} dpi",
                    index + 1,
                    size.width.pt(),
                    size.height.pt(),
                    width,
                    height,
                    dpi
                );
            }
            if let Some(producer) = metadata.producer {
                println!("Producer: {}", producer);
            }
        } else {
            let source = decode_image(input);
            if source.is_empty() {
                println!("Unreadable image");
            } else {
                println!("Size: {}x{} px", source.image.width(), source.image.height());
            }
        }
    }

    Ok(())
}
