mod common;

use common::{canvas, init_tracing, members, settle};
use roster_engine::{Exporter, PointerEvent, RasterOptions, Rasterizer};
use std::sync::Arc;

fn exporter() -> Exporter {
    // No system fonts: keeps the test fast; labels simply rasterise empty.
    let rasterizer = Rasterizer::with_fontdb(Arc::new(usvg::fontdb::Database::new()));
    Exporter::new(rasterizer, RasterOptions::default())
}

#[test]
fn export_returns_identical_url_on_second_call() {
    init_tracing();
    let (mut canvas, _) = canvas();
    canvas.render_members(&members(&["b", "a"]));
    settle(&mut canvas);
    let mut exporter = exporter();

    let first = exporter.export_visible(canvas.scene()).unwrap();
    let second = exporter.export_visible(canvas.scene()).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
    assert!(first.iter().all(|c| c.url.starts_with("blob:")));
    assert_eq!(exporter.cache().len(), 2);
}

#[test]
fn snapshot_is_a_scaled_jpeg() {
    init_tracing();
    let (mut canvas, _) = canvas();
    canvas.render_members(&members(&["octocat"]));
    settle(&mut canvas);
    let mut exporter = exporter();

    let exported = exporter.export_visible(canvas.scene()).unwrap();
    let blob = exporter.resolve(&exported[0].url).unwrap();
    assert_eq!(blob.mime, "image/jpeg");

    let image = image::load_from_memory(&blob.bytes).unwrap();
    assert_eq!((image.width(), image.height()), (480, 200));
}

#[test]
fn cached_snapshot_is_never_refreshed() {
    init_tracing();
    let (mut canvas, _) = canvas();
    canvas.render_members(&members(&["octocat"]));
    settle(&mut canvas);
    let mut exporter = exporter();
    let before = exporter.export_visible(canvas.scene()).unwrap();

    // hovering adds a border, which changes the card's appearance
    canvas.pointer_move(PointerEvent::new(100.0, 80.0));
    let after = exporter.export_visible(canvas.scene()).unwrap();

    assert_eq!(before, after);
    let blob = exporter.resolve(&after[0].url).unwrap();
    let image = image::load_from_memory(&blob.bytes).unwrap();
    assert_eq!(image.width(), 480);
}

#[test]
fn export_of_empty_scene_is_empty() {
    init_tracing();
    let (canvas, _) = canvas();
    let mut exporter = exporter();
    assert!(exporter.export_visible(canvas.scene()).unwrap().is_empty());
}
