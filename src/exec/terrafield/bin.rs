use std::path::{Path, PathBuf};

use glam::Vec2;
use terrafield::{
    HeightSample, IntRect, TerrafieldError,
    brush::BrushStroke,
    datatypes::FileResolution,
    file_format::{
        ImportCheck, heightmap_format_for_path, load_heightmap, resolution_matches, save_heightmap,
    },
    retile::choose_best_component_layout,
    settings::EditorSettings,
};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| "terrafield".to_string());

    let cli = match parse_command(&program, args) {
        Ok(cmd) => cmd,
        Err(err) => {
            eprintln!("{err}");
            print_usage(&program);
            std::process::exit(1);
        }
    };

    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Info(args) => run_info(&args),
        Command::Resample(args) => run_resample(&args),
        Command::Expand(args) => run_expand(&args),
        Command::Stamp(args) => run_stamp(&args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[derive(Debug)]
struct Cli {
    command: Command,
    verbose: bool,
}

#[derive(Debug)]
enum Command {
    Info(InfoArgs),
    Resample(ResampleArgs),
    Expand(ExpandArgs),
    Stamp(StampArgs),
}

#[derive(Debug)]
struct InfoArgs {
    input: PathBuf,
    current: Option<FileResolution>,
}

#[derive(Debug)]
struct ResampleArgs {
    input: PathBuf,
    output: PathBuf,
    from: Option<FileResolution>,
    size: FileResolution,
}

#[derive(Debug)]
struct ExpandArgs {
    input: PathBuf,
    output: PathBuf,
    from: Option<FileResolution>,
    rect: IntRect,
}

#[derive(Debug)]
struct StampArgs {
    input: PathBuf,
    output: PathBuf,
    from: Option<FileResolution>,
    points: Vec<Vec2>,
    settings: Option<PathBuf>,
    target: f32,
    strength: Option<f32>,
}

fn parse_command(program: &str, mut args: impl Iterator<Item = String>) -> Result<Cli, String> {
    let mut verbose = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage(program);
                std::process::exit(0);
            }
            "-v" | "--verbose" => {
                verbose = true;
            }
            other if other.starts_with('-') => {
                return Err(format!("unexpected flag: {other}"));
            }
            other => {
                let command = match other {
                    "info" => parse_info_command(args)?,
                    "resample" => parse_resample_command(args)?,
                    "expand" => parse_expand_command(args)?,
                    "stamp" => parse_stamp_command(args)?,
                    unknown => return Err(format!("unknown command: {unknown}")),
                };
                return Ok(Cli { command, verbose });
            }
        }
    }

    Err(format!("missing arguments\n\nSee '{program} --help'"))
}

fn next_value(flag: &str, args: &mut dyn Iterator<Item = String>) -> Result<String, String> {
    args.next().ok_or_else(|| format!("{flag} requires a value"))
}

/// Collects the leading positional paths; flags are handed to `on_flag`.
fn parse_paths(
    command: &str,
    count: usize,
    mut args: impl Iterator<Item = String>,
    mut on_flag: impl FnMut(&str, &mut dyn Iterator<Item = String>) -> Result<(), String>,
) -> Result<Vec<PathBuf>, String> {
    let mut paths = Vec::new();
    while let Some(arg) = args.next() {
        if arg.starts_with("--") {
            on_flag(&arg, &mut args)?;
        } else if paths.len() < count {
            paths.push(PathBuf::from(arg));
        } else {
            return Err(format!("unexpected argument to {command}: {arg}"));
        }
    }
    if paths.len() != count {
        return Err(format!("{command} requires {count} path(s)"));
    }
    Ok(paths)
}

fn parse_info_command(args: impl Iterator<Item = String>) -> Result<Command, String> {
    let mut current = None;
    let mut paths = parse_paths("info", 1, args, |flag, args| match flag {
        "--current" => {
            current = Some(parse_resolution(&next_value(flag, args)?)?);
            Ok(())
        }
        other => Err(format!("unexpected flag to info: {other}")),
    })?;
    Ok(Command::Info(InfoArgs {
        input: paths.remove(0),
        current,
    }))
}

fn parse_resample_command(args: impl Iterator<Item = String>) -> Result<Command, String> {
    let mut from = None;
    let mut size = None;
    let mut paths = parse_paths("resample", 2, args, |flag, args| {
        match flag {
            "--from" => from = Some(parse_resolution(&next_value(flag, args)?)?),
            "--size" => size = Some(parse_resolution(&next_value(flag, args)?)?),
            other => return Err(format!("unexpected flag to resample: {other}")),
        }
        Ok(())
    })?;
    let output = paths.remove(1);
    Ok(Command::Resample(ResampleArgs {
        input: paths.remove(0),
        output,
        from,
        size: size.ok_or_else(|| "--size is required".to_string())?,
    }))
}

fn parse_expand_command(args: impl Iterator<Item = String>) -> Result<Command, String> {
    let mut from = None;
    let mut rect = None;
    let mut paths = parse_paths("expand", 2, args, |flag, args| {
        match flag {
            "--from" => from = Some(parse_resolution(&next_value(flag, args)?)?),
            "--rect" => rect = Some(parse_rect(&next_value(flag, args)?)?),
            other => return Err(format!("unexpected flag to expand: {other}")),
        }
        Ok(())
    })?;
    let output = paths.remove(1);
    Ok(Command::Expand(ExpandArgs {
        input: paths.remove(0),
        output,
        from,
        rect: rect.ok_or_else(|| "--rect is required".to_string())?,
    }))
}

fn parse_stamp_command(args: impl Iterator<Item = String>) -> Result<Command, String> {
    let mut from = None;
    let mut points = Vec::new();
    let mut settings = None;
    let mut target = HeightSample::MAX as f32;
    let mut strength = None;
    let mut paths = parse_paths("stamp", 2, args, |flag, args| {
        let value = next_value(flag, args)?;
        match flag {
            "--from" => from = Some(parse_resolution(&value)?),
            "--at" => points.push(parse_point(&value)?),
            "--settings" => settings = Some(PathBuf::from(value)),
            "--target" => target = parse_number(flag, &value)?,
            "--strength" => strength = Some(parse_number(flag, &value)?),
            other => return Err(format!("unexpected flag to stamp: {other}")),
        }
        Ok(())
    })?;
    if points.is_empty() {
        return Err("stamp requires at least one --at point".into());
    }
    let output = paths.remove(1);
    Ok(Command::Stamp(StampArgs {
        input: paths.remove(0),
        output,
        from,
        points,
        settings,
        target,
        strength,
    }))
}

fn parse_number(flag: &str, value: &str) -> Result<f32, String> {
    value
        .parse()
        .map_err(|_| format!("{flag} expects a number, got {value}"))
}

fn parse_resolution(value: &str) -> Result<FileResolution, String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected <width>x<height>, got {value}"))?;
    let width = w.parse().map_err(|_| format!("invalid width: {w}"))?;
    let height = h.parse().map_err(|_| format!("invalid height: {h}"))?;
    Ok(FileResolution::new(width, height))
}

fn parse_point(value: &str) -> Result<Vec2, String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected <x>,<y>, got {value}"))?;
    Ok(Vec2::new(parse_number("--at", x)?, parse_number("--at", y)?))
}

fn parse_rect(value: &str) -> Result<IntRect, String> {
    let parts = value
        .split(',')
        .map(|v| v.trim().parse::<i32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| format!("expected <minx>,<miny>,<maxx>,<maxy>, got {value}"))?;
    match parts.as_slice() {
        [min_x, min_y, max_x, max_y] => Ok(IntRect::new(*min_x, *min_y, *max_x, *max_y)),
        _ => Err(format!("expected four values in --rect, got {value}")),
    }
}

fn run_info(args: &InfoArgs) -> Result<(), TerrafieldError> {
    let format = heightmap_format_for_path(&args.input)?;
    let file_info = format.validate(&args.input)?;
    if let Some(warning) = &file_info.warning {
        warn!("{warning}");
    }

    println!("{} ({})", args.input.display(), format.description());
    for resolution in &file_info.possible_resolutions {
        let layout = choose_best_component_layout(
            resolution.width as usize,
            resolution.height as usize,
            &Default::default(),
        );
        match layout {
            Some(layout) => println!(
                "  {resolution}: {}x{} components of {}x{} quads",
                layout.components_x,
                layout.components_y,
                layout.subsections,
                layout.subsection_quads
            ),
            None => println!("  {resolution}"),
        }
    }

    if let Some(current) = args.current {
        match resolution_matches(&file_info.possible_resolutions, current) {
            ImportCheck::Match => println!("matches current landscape {current}"),
            ImportCheck::Mismatch { current, .. } => {
                println!("does not match current landscape {current}; importing will resize it")
            }
        }
    }
    Ok(())
}

fn run_resample(args: &ResampleArgs) -> Result<(), TerrafieldError> {
    let grid = load_heightmap(&args.input, args.from)?;
    let resampled = grid.resampled(args.size.width as usize, args.size.height as usize)?;
    save_heightmap(&args.output, &resampled)?;
    info!(input = %args.input.display(), output = %args.output.display(), size = %args.size, "resampled heightmap");
    Ok(())
}

fn run_expand(args: &ExpandArgs) -> Result<(), TerrafieldError> {
    let grid = load_heightmap(&args.input, args.from)?;
    let expanded = grid.expanded(args.rect)?;
    save_heightmap(&args.output, &expanded)?;
    info!(input = %args.input.display(), output = %args.output.display(), rect = %args.rect, "expanded heightmap");
    Ok(())
}

fn load_settings(path: Option<&Path>) -> Result<EditorSettings, TerrafieldError> {
    match path {
        Some(path) => EditorSettings::load(path),
        None => Ok(EditorSettings::default()),
    }
}

fn run_stamp(args: &StampArgs) -> Result<(), TerrafieldError> {
    let settings = load_settings(args.settings.as_deref())?;
    let mut grid = load_heightmap(&args.input, args.from)?;

    let stroke = BrushStroke::circle(settings.brush.curve, settings.falloff_params());
    let stamp = stroke.apply(&args.points, grid.rect());
    if stamp.is_empty() {
        warn!("brush stroke does not touch the heightmap");
    }
    debug!(stamp = %stamp.rect(), "applying brush");

    let strength = args.strength.unwrap_or(settings.brush.strength);
    grid.blend_toward(&stamp, args.target, strength);
    save_heightmap(&args.output, &grid)?;
    info!(output = %args.output.display(), points = args.points.len(), "stamped heightmap");
    Ok(())
}

fn print_usage(program: &str) {
    eprintln!("Usage:");
    eprintln!("  {program} info <heightmap> [--current <W>x<H>]");
    eprintln!("  {program} resample <in> <out> --size <W>x<H> [--from <W>x<H>]");
    eprintln!("  {program} expand <in> <out> --rect <minx>,<miny>,<maxx>,<maxy> [--from <W>x<H>]");
    eprintln!(
        "  {program} stamp <in> <out> --at <x>,<y> [--at ...] [--from <W>x<H>] [--settings <editor.json>] [--target <height>] [--strength <0-1>]"
    );
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --from        Resolution of a raw input with several possible sizes");
    eprintln!("  -v, --verbose Emit debug logging (RUST_LOG overrides)");
    eprintln!("  -h, --help    Show this help message");
    eprintln!();
    eprintln!("Formats:");
    eprintln!("  .png (16-bit grayscale), .r16, .raw");
}
