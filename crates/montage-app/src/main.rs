//! Montage - headless project tool
//!
//! Loads a project file and inspects, validates or evaluates it.

use anyhow::{bail, Context, Result};
use montage_eval::{Evaluator, Layer, LayerSource, MemoryMediaLibrary, MemoryProxyCache};
use montage_timeline::{Composition, ProjectFile, TimelineStore};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage:
  montage inspect <project.json>
  montage validate <project.json>
  montage evaluate <project.json> <seconds> [--json]";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("inspect") => inspect(&project_path(&args)?),
        Some("validate") => validate(&project_path(&args)?),
        Some("evaluate") => {
            let time: f64 = args
                .get(2)
                .context(USAGE)?
                .parse()
                .context("time must be a number of seconds")?;
            let json = args.iter().any(|a| a == "--json");
            evaluate(&project_path(&args)?, time, json)
        }
        _ => bail!(USAGE),
    }
}

fn project_path(args: &[String]) -> Result<PathBuf> {
    args.get(1).map(PathBuf::from).context(USAGE)
}

fn load(path: &Path) -> Result<(String, TimelineStore)> {
    let file = ProjectFile::load_from_file(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let name = file.project.name.clone();
    let store = TimelineStore::from_project(file.project)
        .with_context(|| format!("{} is not a valid project", path.display()))?;
    info!(project = %name, version = file.version, "Loaded project");
    Ok((name, store))
}

fn validate(path: &Path) -> Result<()> {
    let (name, store) = load(path)?;
    println!(
        "{name}: ok ({} compositions, {} clips in the active one)",
        store.composition_ids().len(),
        store.active().clips.len()
    );
    Ok(())
}

fn inspect(path: &Path) -> Result<()> {
    let (name, store) = load(path)?;
    println!("Project: {name}");
    for id in store.composition_ids() {
        if let Some(comp) = store.composition(id) {
            print_composition(comp, id == store.active_id());
        }
    }
    Ok(())
}

fn print_composition(comp: &Composition, active: bool) {
    println!(
        "\nComposition {} \"{}\"{} {}x{} @ {:.3} fps, {:.2}s",
        comp.id,
        comp.name,
        if active { " (active)" } else { "" },
        comp.width,
        comp.height,
        comp.frame_rate.to_fps_f64(),
        comp.duration
    );
    for track in &comp.tracks {
        let mut flags = Vec::new();
        if !track.visible {
            flags.push("hidden");
        }
        if track.muted {
            flags.push("muted");
        }
        if track.solo {
            flags.push("solo");
        }
        if track.locked {
            flags.push("locked");
        }
        println!("  {:?} track \"{}\" {}", track.kind, track.name, flags.join(" "));
        for clip in comp.clips_on_track(track.id) {
            let group = clip
                .linked_group_id
                .map(|g| format!(" group={g}"))
                .unwrap_or_default();
            println!(
                "    [{:8.3} .. {:8.3}) \"{}\" in={:.3} out={:.3} speed={}{}",
                clip.start_time,
                clip.end_time(),
                clip.name,
                clip.in_point,
                clip.out_point,
                clip.speed,
                group
            );
        }
    }
    for group in &comp.linked_groups {
        println!(
            "  Linked group {} master={} members={}",
            group.id,
            group.master_clip_id,
            group.len()
        );
    }
}

fn evaluate(path: &Path, time: f64, json: bool) -> Result<()> {
    let (_, store) = load(path)?;

    // Every referenced media item is treated as available.
    let media = MemoryMediaLibrary::new();
    for id in store.composition_ids() {
        let Some(comp) = store.composition(id) else {
            continue;
        };
        for clip in &comp.clips {
            if let (Some(media_id), Some(natural)) = (
                clip.source.media_id(),
                clip.source.natural_duration(store.config().unbounded_duration),
            ) {
                media.insert(media_id, natural);
            }
        }
    }
    let proxies = MemoryProxyCache::new();
    let evaluator = Evaluator::new(&store, &media, &proxies, store.config());
    let layers = evaluator.evaluate_at_time(store.active_id(), time)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&layers)?);
    } else {
        println!("{} layers at {time:.3}s (bottom first)", layers.len());
        print_layers(&layers, 1);
    }
    Ok(())
}

fn print_layers(layers: &[Layer], depth: usize) {
    let indent = "  ".repeat(depth);
    for layer in layers {
        let source = match &layer.source {
            LayerSource::Media {
                media_id,
                source_time,
            } => format!("media {media_id} @ {source_time:.3}s"),
            LayerSource::Proxy {
                media_id,
                frame_index,
                frame,
            } => format!(
                "proxy {media_id} frame {frame_index}{}",
                if frame.is_some() { "" } else { " (pending)" }
            ),
            LayerSource::Image { media_id } => format!("image {media_id}"),
            LayerSource::Text { text } => format!("text {text:?}"),
            LayerSource::Solid { color } => format!("solid {color:?}"),
            LayerSource::Nested { composition_id, .. } => format!("nested {composition_id}"),
        };
        println!(
            "{indent}{source} pos={:?} scale={:?} rot={:.1} opacity={:.2}",
            layer.position, layer.scale, layer.rotation, layer.opacity
        );
        if let Some(nested) = layer.nested_layers() {
            print_layers(nested, depth + 1);
        }
    }
}
