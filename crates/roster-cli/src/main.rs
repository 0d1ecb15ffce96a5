//! # Roster CLI
//!
//! Headless driver for the roster canvas.
//!
//! ## Commands
//! - `render`: reconcile a member list onto a canvas, settle every animation,
//!   write the scene SVG and one snapshot image per card.
//! - `plan`: show what reconciling one member list into another would do.
//! - `url`: print the GitHub org members URL for a page.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use roster_engine::member::{parse_member_list, search_members};
use roster_engine::surface::{HeadlessWindow, SvgSurface};
use roster_engine::systems::reconciler::{PlanEntry, ShownCard};
use roster_engine::{
    CanvasConfig, DefaultAvatarLoader, Exporter, Member, MemberField, RasterFormat,
    RasterOptions, Rasterizer, ReconcilePlan, RosterCanvas,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

const FRAME_MS: f64 = 16.0;
const MAX_FRAMES: usize = 10_000;

#[derive(Parser)]
#[command(name = "roster")]
#[command(about = "Render member rosters as animated cards")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a member list and export card snapshots
    Render {
        /// JSON file with member records or a GitHub members listing
        #[arg(short, long)]
        members: PathBuf,

        /// Optional canvas config (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Only keep members whose field contains this text
        #[arg(short, long)]
        search: Option<String>,

        /// Field used by --search: id, username, name, avatar, url
        #[arg(long, default_value = "username")]
        field: MemberField,

        /// Output directory
        #[arg(short, long, default_value = "roster-out")]
        out: PathBuf,

        /// Device pixel ratio applied to snapshots
        #[arg(long, default_value_t = 1.0)]
        dpr: f32,

        /// Export PNG instead of JPEG
        #[arg(long)]
        png: bool,

        /// Window width
        #[arg(long, default_value_t = 1280.0)]
        width: f32,

        /// Window height, including host chrome
        #[arg(long, default_value_t = 850.0)]
        height: f32,
    },

    /// Print the reconcile plan between two member lists
    Plan {
        /// Members currently shown
        #[arg(long)]
        from: PathBuf,

        /// Desired members
        #[arg(long)]
        to: PathBuf,
    },

    /// Print the org members API URL
    Url {
        org: String,

        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("roster=info,roster_engine=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            members,
            config,
            search,
            field,
            out,
            dpr,
            png,
            width,
            height,
        } => cmd_render(RenderArgs {
            members: &members,
            config: config.as_deref(),
            search: search.as_deref(),
            field,
            out: &out,
            dpr,
            png,
            window: (width, height),
        }),
        Commands::Plan { from, to } => cmd_plan(&from, &to),
        Commands::Url { org, page } => {
            println!("{}", roster_engine::member::members_url(&org, page));
            Ok(())
        }
    }
}

fn load_members(path: &Path) -> Result<Vec<Member>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read members: {}", path.display()))?;
    parse_member_list(&json).with_context(|| format!("Invalid members file: {}", path.display()))
}

fn load_config(path: Option<&Path>) -> Result<CanvasConfig> {
    let Some(path) = path else {
        return Ok(CanvasConfig::default());
    };
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Invalid config: {}", path.display()))
}

struct RenderArgs<'a> {
    members: &'a Path,
    config: Option<&'a Path>,
    search: Option<&'a str>,
    field: MemberField,
    out: &'a Path,
    dpr: f32,
    png: bool,
    window: (f32, f32),
}

fn cmd_render(args: RenderArgs<'_>) -> Result<()> {
    let mut members = load_members(args.members)?;
    if let Some(search) = args.search {
        members = search_members(&members, args.field, search);
    }
    let config = load_config(args.config)?;
    info!(count = members.len(), "rendering members");

    let window = Arc::new(HeadlessWindow::new(args.window.0, args.window.1));
    let mut canvas = RosterCanvas::new(
        config,
        SvgSurface::new(),
        window,
        Arc::new(DefaultAvatarLoader),
    );
    canvas.render_members(&members);
    let frames = canvas.run_until_idle(FRAME_MS, MAX_FRAMES);
    if !canvas.is_settled() {
        warn!(frames, "canvas did not settle");
    }

    fs::create_dir_all(args.out)
        .with_context(|| format!("Failed to create {}", args.out.display()))?;
    let svg_path = args.out.join("canvas.svg");
    let frame = canvas
        .surface()
        .last_frame()
        .context("canvas produced no frame")?;
    fs::write(&svg_path, frame).with_context(|| format!("Failed to write {}", svg_path.display()))?;

    let options = RasterOptions {
        format: if args.png {
            RasterFormat::Png
        } else {
            RasterFormat::Jpeg
        },
        device_pixel_ratio: args.dpr,
        ..RasterOptions::default()
    };
    let extension = options.format.extension();
    let mut exporter = Exporter::new(Rasterizer::new(), options);
    let exported = exporter.export_visible(canvas.scene())?;

    let mut manifest = serde_json::Map::new();
    for card in &exported {
        let blob = exporter
            .resolve(&card.url)
            .with_context(|| format!("snapshot for {} was not registered", card.username))?;
        let file = format!("{}.{extension}", card.username);
        let path = args.out.join(&file);
        fs::write(&path, &blob.bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        manifest.insert(card.username.clone(), serde_json::Value::String(file));
    }
    println!("{}", serde_json::to_string_pretty(&manifest)?);
    info!(cards = exported.len(), out = %args.out.display(), frames, "render complete");

    canvas.dispose();
    Ok(())
}

fn cmd_plan(from: &Path, to: &Path) -> Result<()> {
    let shown: Vec<ShownCard> = load_members(from)?
        .into_iter()
        .enumerate()
        .map(|(node, member)| ShownCard {
            node,
            username: member.username,
            exiting: false,
        })
        .collect();
    let desired = load_members(to)?;
    let plan = ReconcilePlan::compute(&desired, &shown);

    let added: Vec<&str> = plan.to_add.iter().map(|m| m.username.as_str()).collect();
    let removed: Vec<&str> = plan.to_remove.iter().map(|c| c.username.as_str()).collect();
    println!("add:    {}", added.join(", "));
    println!("remove: {}", removed.join(", "));
    println!("order:");
    let layout = CanvasConfig::default().layout;
    for (rank, entry) in plan.final_order.iter().enumerate() {
        let slot = layout.slot(rank);
        let status = match entry {
            PlanEntry::Existing { .. } => "stay",
            PlanEntry::Incoming(_) => "new",
        };
        println!(
            "  {:>3}  ({}, {})  {:<5} {}",
            rank,
            slot.x,
            slot.y,
            status,
            entry.username()
        );
    }
    Ok(())
}
