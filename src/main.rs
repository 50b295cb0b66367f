use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rootcause::prelude::*;

use msts_shape::export::geometry::PROGRESS_INTERVAL;
use msts_shape::export::{ExportOptions, export_shape_file};
use msts_shape::scene::Scene;

/// Export a JSON scene description to an MSTS / OpenRails shape file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scene JSON file
    scene: PathBuf,

    /// Output shape file. Defaults to the scene path with a `.s` extension
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Name of the root collection holding the LOD collections
    #[clap(long, default_value = "MAIN")]
    root: String,

    /// Keep every object as its own hierarchy entry
    #[clap(long)]
    retain_names: bool,

    /// Reference .dds textures instead of .ace
    #[clap(long)]
    use_dds: bool,

    /// Keep the full UV and normal lookup index for the whole export
    #[clap(long)]
    no_fast_export: bool,

    /// Don't split sub-objects by hierarchy entry
    #[clap(long)]
    no_hierarchy_optimization: bool,

    /// Log per-object and per-draw-call detail
    #[clap(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Report> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let text = fs::read_to_string(&args.scene)
        .context_with(|| format!("Failed to read {}", args.scene.display()))?;
    let scene: Scene = serde_json::from_str(&text)
        .context_with(|| format!("Failed to parse scene {}", args.scene.display()))?;

    let output = match args.output {
        Some(path) if path.extension().is_some() => path,
        Some(path) => path.with_extension("s"),
        None => args.scene.with_extension("s"),
    };

    let options = ExportOptions::builder()
        .root_name(args.root)
        .retain_names(args.retain_names)
        .use_dds(args.use_dds)
        .fast_export(!args.no_fast_export)
        .hierarchy_optimization(!args.no_hierarchy_optimization)
        .build();

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = export_shape_file(&scene, &options, &output, |ticks| {
        spinner.set_message(format!("{} triangles", ticks * PROGRESS_INTERVAL as u64));
    });
    spinner.finish_and_clear();
    let summary = result.context_with(|| format!("Failed to export {}", args.scene.display()))?;

    for level in &summary.levels {
        println!(
            "LOD {:>6}: {:>3} sub-objects {:>4} draw calls {:>7} triangles",
            level.selection, level.sub_objects, level.primitives, level.triangles
        );
    }
    println!(
        "{} points ({} before merging), {} images",
        summary.points,
        summary.points_before_compaction,
        summary.images.len()
    );
    println!("Wrote {}", output.display());

    Ok(())
}
