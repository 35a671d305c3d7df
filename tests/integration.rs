//! Integration tests for the kelpmark library

use image::{Rgba, RgbaImage};
use kelpmark::dialogs::ScriptedPrompter;
use kelpmark::editor::{DirectoryPreviews, Editor, NoPreviews};
use kelpmark::export::{self, ExportFormat};
use kelpmark::font::{FontBook, FontFace};
use kelpmark::pdf::extract_metadata;
use kelpmark::watermark::{paint_on, watermarked};
use kelpmark::StyleConfig;
use std::path::Path;
use tempfile::TempDir;

/// A resolved system font, or None when the machine has no fonts
fn system_face() -> Option<FontFace> {
    let mut fonts = FontBook::system();
    if fonts.is_empty() {
        eprintln!("Skipping test: no system fonts installed");
        return None;
    }
    fonts.resolve("Serif", false, false).ok()
}

/// Opaque image with a pattern, so that changes anywhere are visible
fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 7 % 256) as u8, (y * 5 % 256) as u8, ((x + y) % 256) as u8, 255])
    })
}

fn write_png(dir: &Path, name: &str, image: &RgbaImage) -> std::path::PathBuf {
    let path = dir.join(name);
    image.save(&path).expect("Failed to write fixture image");
    path
}

#[test]
fn test_invisible_watermark_keeps_pixels() {
    let Some(face) = system_face() else { return };
    let source = gradient(120, 80);
    let style = StyleConfig {
        text: "INVISIBLE".to_string(),
        opacity: 0,
        tiling: true,
        angle: 30.0,
        ..StyleConfig::default()
    };

    let marked = watermarked(&source, &style, &face).expect("Failed to watermark");
    assert_eq!(marked, source);
}

#[test]
fn test_tiling_is_deterministic() {
    let Some(face) = system_face() else { return };
    let style = StyleConfig {
        text: "COPY\nCOPY".to_string(),
        angle: -45.0,
        tiling: true,
        staggered: true,
        ..StyleConfig::default()
    };

    let mut first = gradient(300, 200);
    let mut second = first.clone();
    let report_a = paint_on(&mut first, &style, &face).expect("Failed to paint");
    let report_b = paint_on(&mut second, &style, &face).expect("Failed to paint");

    assert_eq!(report_a, report_b);
    assert_eq!(first, second);
    assert!(report_a.instances > 1, "tiling should add copies around the center");
    assert_ne!(first, gradient(300, 200));
}

#[test]
fn test_untiled_draws_single_instance() {
    let Some(face) = system_face() else { return };
    let style = StyleConfig {
        text: "ONCE".to_string(),
        ..StyleConfig::default()
    };

    let mut image = gradient(200, 100);
    let report = paint_on(&mut image, &style, &face).expect("Failed to paint");
    assert_eq!(report.instances, 1);
    assert!(report.plan.tiles.is_empty());
}

#[test]
fn test_export_three_images_numbered() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let images = vec![gradient(10, 10), gradient(20, 10), gradient(10, 20)];

    let written = export::save(&images, &temp_dir.path().join("out.png")).expect("Failed to save");

    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["out-01.png", "out-02.png", "out-03.png"]);
    for (path, image) in written.iter().zip(&images) {
        assert_eq!(image::image_dimensions(path).unwrap(), image.dimensions());
    }
    assert!(!temp_dir.path().join("out.png").exists());
}

#[test]
fn test_export_pdf_pages_sized_to_images() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let output = temp_dir.path().join("marked.pdf");
    let images = vec![gradient(300, 200), gradient(100, 400)];

    let written = export::save(&images, &output).expect("Failed to save PDF");
    assert_eq!(written, vec![output.clone()]);

    let metadata = extract_metadata(&output).expect("Failed to read PDF back");
    assert_eq!(metadata.page_count(), 2);
    assert_eq!(metadata.page_sizes[0].width.pt(), 300.0);
    assert_eq!(metadata.page_sizes[0].height.pt(), 200.0);
    assert_eq!(metadata.page_sizes[1].width.pt(), 100.0);
    assert_eq!(metadata.page_sizes[1].height.pt(), 400.0);
}

/// Width, height and RGB samples of the first image on every page
fn page_images(path: &Path) -> Vec<(i64, i64, Vec<u8>)> {
    let doc = lopdf::Document::load(path).expect("Failed to load PDF");
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let image_id = doc
                .get_dictionary(page_id)
                .and_then(|page| page.get(b"Resources"))
                .and_then(lopdf::Object::as_dict)
                .and_then(|resources| resources.get(b"XObject"))
                .and_then(lopdf::Object::as_dict)
                .and_then(|xobjects| xobjects.get(b"Im1"))
                .and_then(lopdf::Object::as_reference)
                .expect("Page has no image");
            let stream = doc
                .get_object(image_id)
                .and_then(lopdf::Object::as_stream)
                .expect("Image is not a stream");
            let width = stream.dict.get(b"Width").and_then(lopdf::Object::as_i64).unwrap();
            let height = stream.dict.get(b"Height").and_then(lopdf::Object::as_i64).unwrap();
            let samples = stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone());
            (width, height, samples)
        })
        .collect()
}

fn rgb_samples(image: &RgbaImage) -> Vec<u8> {
    image.pixels().flat_map(|p| [p.0[0], p.0[1], p.0[2]]).collect()
}

#[test]
fn test_export_pdf_pages_carry_watermarked_images() {
    let Some(face) = system_face() else { return };
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let output = temp_dir.path().join("marked.pdf");

    let style = StyleConfig {
        text: "PAGE".to_string(),
        opacity: 255,
        tiling: true,
        ..StyleConfig::default()
    };
    let sources = vec![gradient(160, 120), gradient(90, 200)];
    let marked: Vec<RgbaImage> = sources
        .iter()
        .map(|source| watermarked(source, &style, &face).expect("Failed to watermark"))
        .collect();

    export::save(&marked, &output).expect("Failed to save PDF");

    let pages = page_images(&output);
    assert_eq!(pages.len(), 2);
    for ((width, height, samples), (source, image)) in pages.iter().zip(sources.iter().zip(&marked)) {
        assert_eq!((*width, *height), (i64::from(source.width()), i64::from(source.height())));
        assert_eq!(samples, &rgb_samples(image));
        assert_ne!(samples, &rgb_samples(source), "page should carry the watermark");
    }
}

#[test]
fn test_editor_marks_and_exports_files() {
    if FontBook::system().is_empty() {
        eprintln!("Skipping test: no system fonts installed");
        return;
    }
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let first = write_png(temp_dir.path(), "a.png", &gradient(64, 48));
    let second = write_png(temp_dir.path(), "b.png", &gradient(32, 32));

    let style = StyleConfig {
        text: "DRAFT".to_string(),
        tiling: true,
        ..StyleConfig::default()
    };
    let mut editor = Editor::new(style, FontBook::system(), NoPreviews);
    let target = temp_dir.path().join("result");
    let mut prompter = ScriptedPrompter::new().with_save(&target, ExportFormat::Pdf);

    editor.load_file(&first, &mut prompter).expect("Failed to load");
    editor.load_file(&second, &mut prompter).expect("Failed to load");
    let written = editor.save(&mut prompter).expect("Failed to save");

    // No known extension, so the PDF filter's one is appended
    let expected = temp_dir.path().join("result.pdf");
    assert_eq!(written, vec![expected.clone()]);
    assert_eq!(extract_metadata(&expected).unwrap().page_count(), 2);
}

#[test]
fn test_editor_writes_zoomed_previews() {
    if FontBook::system().is_empty() {
        eprintln!("Skipping test: no system fonts installed");
        return;
    }
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let input = write_png(temp_dir.path(), "in.png", &gradient(90, 60));
    let previews = temp_dir.path().join("previews");

    let style = StyleConfig {
        text: "PREVIEW".to_string(),
        ..StyleConfig::default()
    };
    let mut editor = Editor::new(style, FontBook::system(), DirectoryPreviews::new(&previews));
    let mut prompter = ScriptedPrompter::new();
    editor.load_file(&input, &mut prompter).expect("Failed to load");
    editor.zoom_out().expect("Failed to zoom");

    let files: Vec<_> = editor.sink().files().map(Path::to_path_buf).collect();
    assert_eq!(files, vec![previews.join("preview-01.png")]);
    assert_eq!(image::image_dimensions(&files[0]).unwrap(), (60, 40));
}
