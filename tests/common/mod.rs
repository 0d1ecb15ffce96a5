#![allow(dead_code)]

use roster_engine::surface::{HeadlessWindow, SvgSurface};
use roster_engine::{AvatarLoader, CanvasConfig, LoadMode, Member, RosterCanvas};
use std::io::Cursor;
use std::sync::Arc;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Serves a small PNG for every URL except ones containing "missing".
pub struct PngLoader;

impl AvatarLoader for PngLoader {
    fn load_bytes(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        if url.contains("missing") {
            anyhow::bail!("404 for {url}");
        }
        square_png(8)
    }
}

pub fn canvas() -> (RosterCanvas<SvgSurface>, Arc<HeadlessWindow>) {
    canvas_with(CanvasConfig {
        load_mode: LoadMode::Inline,
        ..CanvasConfig::default()
    })
}

pub fn canvas_with(config: CanvasConfig) -> (RosterCanvas<SvgSurface>, Arc<HeadlessWindow>) {
    canvas_with_loader(config, Arc::new(PngLoader))
}

pub fn canvas_with_loader(
    config: CanvasConfig,
    loader: Arc<dyn AvatarLoader>,
) -> (RosterCanvas<SvgSurface>, Arc<HeadlessWindow>) {
    let window = Arc::new(HeadlessWindow::new(1280.0, 850.0));
    let canvas = RosterCanvas::new(config, SvgSurface::new(), window.clone(), loader);
    (canvas, window)
}

pub fn square_png(side: u32) -> anyhow::Result<Vec<u8>> {
    let img = image::RgbaImage::from_pixel(side, side, image::Rgba([132, 163, 140, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)?;
    Ok(out.into_inner())
}

pub fn members(usernames: &[&str]) -> Vec<Member> {
    usernames
        .iter()
        .map(|u| Member::new(*u).with_avatar(format!("{u}.png")))
        .collect()
}

pub fn settle(canvas: &mut RosterCanvas<SvgSurface>) {
    let frames = canvas.run_until_idle(16.0, 1_000);
    assert!(canvas.is_settled(), "canvas still busy after {frames} frames");
}

/// (username, left, top, opacity) for every card, top to bottom.
pub fn layout(canvas: &RosterCanvas<SvgSurface>) -> Vec<(String, f32, f32, f32)> {
    let mut cards: Vec<_> = canvas
        .scene()
        .cards()
        .map(|(_, node, card)| {
            let p = node.placement;
            (card.username().to_string(), p.left, p.top, p.opacity)
        })
        .collect();
    cards.sort_by(|a, b| a.2.total_cmp(&b.2));
    cards
}
