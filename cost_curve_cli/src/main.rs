use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueHint};
use cost_curve::{build_chart, parse_csv, ChartConfig, ChartGeometry, FixedPrice, ParseReport};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod price;
mod render;

use price::{join_lookup, spawn_lookup, HttpPriceSource};
use render::{render_chart_guard, ChartKind};

#[derive(Parser, Debug)]
#[command(author, version, about = "Cost curve chart renderer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Lay out a cost curve from a CSV table and export it
    Render(RenderArgs),
    /// Print summary statistics for a CSV table
    Stats(StatsArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// CSV table with `name,production,cost,highlight` rows
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Output PNG path (defaults next to the input)
    #[arg(long, value_hint = ValueHint::FilePath)]
    png: Option<PathBuf>,

    /// Output SVG path
    #[arg(long, value_hint = ValueHint::FilePath)]
    svg: Option<PathBuf>,

    /// Disable chart output
    #[arg(long, action = ArgAction::SetTrue)]
    no_plot: bool,

    /// Write the bar layout table (`-` for stdout)
    #[arg(long, value_hint = ValueHint::FilePath)]
    layout_csv: Option<PathBuf>,

    /// Write the full chart geometry as JSON
    #[arg(long, value_hint = ValueHint::FilePath)]
    json: Option<PathBuf>,

    /// Chart configuration JSON (colors, toggles, plot area)
    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Chart title
    #[arg(long)]
    title: Option<String>,

    /// Surface width in pixels
    #[arg(long)]
    width: Option<f64>,

    /// Surface height in pixels
    #[arg(long)]
    height: Option<f64>,

    /// Hide quartile markers
    #[arg(long, action = ArgAction::SetTrue)]
    no_quartiles: bool,

    /// Hide the weighted average line
    #[arg(long, action = ArgAction::SetTrue)]
    no_average: bool,

    /// Hide the reference price line
    #[arg(long, action = ArgAction::SetTrue)]
    no_price: bool,

    /// Hide names of highlighted bars
    #[arg(long, action = ArgAction::SetTrue)]
    no_labels: bool,

    /// Reference price to draw
    #[arg(long, conflicts_with = "price_url")]
    price: Option<f64>,

    /// URL returning JSON with the reference price
    #[arg(long)]
    price_url: Option<String>,

    /// JSON pointer of the price within the response
    #[arg(long, default_value = "/price")]
    price_pointer: String,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Parser, Debug)]
struct StatsArgs {
    /// CSV table with `name,production,cost,highlight` rows
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = match &cli.command {
        Command::Render(args) => args.verbose,
        Command::Stats(args) => args.verbose,
    };
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match cli.command {
        Command::Render(args) => handle_render(args),
        Command::Stats(args) => handle_stats(args),
    }
}

fn handle_render(args: RenderArgs) -> Result<()> {
    let config = resolve_config(&args)?;

    // The lookup runs while the table is parsed; a failure only drops the overlay.
    let lookup = if !config.show_price_line {
        None
    } else if let Some(url) = args.price_url.as_ref() {
        Some(spawn_lookup(HttpPriceSource::new(url.clone(), args.price_pointer.clone())))
    } else {
        args.price.map(|p| spawn_lookup(FixedPrice(p)))
    };

    let report = load_input(&args.input);
    log_report(&report);

    let price = lookup.and_then(join_lookup);
    let geometry = build_chart(&report.records, &config, price)?;
    info!(
        "Laid out {} bars: total production {:.1}, max cost {:.2}",
        geometry.bars.len(),
        geometry.statistics.total_production,
        geometry.statistics.max_cost
    );

    if let Some(path) = args.layout_csv.as_ref() {
        if path.as_os_str() == "-" {
            let stdout = io::stdout();
            let mut writer = csv::Writer::from_writer(stdout.lock());
            write_layout_rows(&geometry, &mut writer)?;
        } else {
            write_layout_csv(&geometry, path)?;
            info!("Wrote layout CSV: {}", path.display());
        }
    }

    if let Some(path) = args.json.as_ref() {
        write_geometry_json(&geometry, path)?;
        info!("Wrote geometry JSON: {}", path.display());
    }

    if !args.no_plot {
        let png_path = args
            .png
            .clone()
            .unwrap_or_else(|| args.input.with_extension("png"));
        let mut targets = vec![(png_path, ChartKind::Png)];
        if let Some(path) = args.svg.as_ref() {
            targets.push((path.clone(), ChartKind::Svg));
        }
        for (path, kind) in targets {
            if let Err(err) = render_chart_guard(&geometry, &config, &path, kind) {
                warn!("Skipping {:?} render ({}): {}", kind, path.display(), err);
            } else {
                info!("Wrote chart: {}", path.display());
            }
        }
    }

    Ok(())
}

fn handle_stats(args: StatsArgs) -> Result<()> {
    let report = load_input(&args.input);
    log_report(&report);
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_stats(&report, &mut handle)?;
    Ok(())
}

/// Read the input table. An unreadable file is treated as an empty table;
/// bytes that are not UTF-8 are replaced rather than failing the read.
fn load_input(path: &Path) -> ParseReport {
    match fs::read(path) {
        Ok(bytes) => {
            let text = String::from_utf8_lossy(&bytes);
            if text.contains(char::REPLACEMENT_CHARACTER) {
                warn!(
                    "{} is not valid UTF-8; undecodable bytes were replaced",
                    path.display()
                );
            }
            parse_csv(&text)
        }
        Err(err) => {
            warn!("Could not read {} ({}); continuing with no rows", path.display(), err);
            ParseReport::default()
        }
    }
}

fn log_report(report: &ParseReport) {
    info!(
        "Parsed {} rows: {} kept, {} dropped",
        report.rows_seen,
        report.records.len(),
        report.dropped()
    );
    if report.dropped() > 0 {
        debug!(
            "Dropped rows: {} with fewer than 4 fields, {} with non-positive production or cost",
            report.dropped_short, report.dropped_invalid
        );
    }
}

fn resolve_config(args: &RenderArgs) -> Result<ChartConfig> {
    let mut config = match args.config.as_ref() {
        Some(path) => load_config(path)?,
        None => ChartConfig::default(),
    };
    if let Some(title) = args.title.as_ref() {
        config.title = title.clone();
    }
    if let Some(width) = args.width {
        config.area.width = width;
    }
    if let Some(height) = args.height {
        config.area.height = height;
    }
    config.show_quartiles &= !args.no_quartiles;
    config.show_weighted_average &= !args.no_average;
    config.show_price_line &= !args.no_price;
    config.show_labels &= !args.no_labels;
    config.area.validate()?;
    Ok(config)
}

fn load_config(path: &Path) -> Result<ChartConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    ChartConfig::from_json_str(&text).with_context(|| format!("invalid config {}", path.display()))
}

fn write_layout_csv(geometry: &ChartGeometry, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);
    write_layout_rows(geometry, &mut writer)
}

fn write_layout_rows<W: Write>(geometry: &ChartGeometry, writer: &mut csv::Writer<W>) -> Result<()> {
    writer.write_record([
        "sequence_id",
        "name",
        "production",
        "cost",
        "highlight",
        "cumulative_production",
        "x",
        "y",
        "width",
        "height",
    ])?;

    for bar in &geometry.bars {
        let layout = &geometry.records[bar.index];
        let record = &layout.record;
        writer.write_record([
            record.sequence_id.to_string(),
            record.name.clone(),
            format!("{:.3}", record.production),
            format!("{:.3}", record.cost),
            if record.highlight { "1" } else { "0" }.to_string(),
            format!("{:.3}", layout.cumulative_production),
            format!("{:.3}", bar.x),
            format!("{:.3}", bar.y),
            format!("{:.3}", bar.width),
            format!("{:.3}", bar.height),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

fn write_geometry_json(geometry: &ChartGeometry, path: &Path) -> Result<()> {
    let text = serde_json::to_string_pretty(geometry)?;
    fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn write_stats<W: Write>(report: &ParseReport, out: &mut W) -> Result<()> {
    let stats = cost_curve::chart_statistics(&report.records);
    writeln!(out, "rows: {}", report.rows_seen)?;
    writeln!(out, "kept: {}", report.records.len())?;
    writeln!(
        out,
        "dropped: {} (short {}, invalid {})",
        report.dropped(),
        report.dropped_short,
        report.dropped_invalid
    )?;
    writeln!(out, "total_production: {:.3}", stats.total_production)?;
    writeln!(out, "max_cost: {:.3}", stats.max_cost)?;
    writeln!(
        out,
        "quartiles: q1={:.3} median={:.3} q3={:.3}",
        stats.quartiles.q1, stats.quartiles.median, stats.quartiles.q3
    )?;
    match stats.weighted_average_cost {
        Some(avg) => writeln!(out, "weighted_average_cost: {:.3}", avg)?,
        None => writeln!(out, "weighted_average_cost: n/a")?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "name,production,cost,highlight\nA,100,10,0\nB,200,20,1\nC,50,5,0\n";

    fn render_args(extra: &[&str]) -> RenderArgs {
        let mut argv = vec!["cost-curve", "render", "mines.csv"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Render(args) => args,
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("chart.json");
        fs::write(
            &config_path,
            r##"{"title": "From file", "show_labels": true, "colors": {"bar": "#102030"}}"##,
        )
        .unwrap();
        let config_arg = config_path.to_str().unwrap();
        let args = render_args(&[
            "--config",
            config_arg,
            "--title",
            "From flag",
            "--width",
            "1600",
            "--no-labels",
            "--no-quartiles",
        ]);
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.title, "From flag");
        assert_eq!(config.area.width, 1600.0);
        assert!(!config.show_labels);
        assert!(!config.show_quartiles);
        assert!(config.show_weighted_average);
        assert_eq!(config.colors.bar.to_string(), "#102030");
    }

    #[test]
    fn test_invalid_surface_rejected() {
        let args = render_args(&["--width", "60"]);
        assert!(resolve_config(&args).is_err());
        let args = render_args(&["--width", "1e9"]);
        assert!(resolve_config(&args).is_err());
    }

    #[test]
    fn test_price_sources_conflict() {
        let argv = [
            "cost-curve",
            "render",
            "mines.csv",
            "--price",
            "1900",
            "--price-url",
            "http://localhost/price",
        ];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_missing_input_is_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let report = load_input(&dir.path().join("absent.csv"));
        assert!(report.records.is_empty());
        assert_eq!(report.rows_seen, 0);
    }

    #[test]
    fn test_non_utf8_name_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("cp1252.csv");
        // "Pe\xf1asquito" as written by a Windows-1252 export.
        let mut bytes = b"name,production,cost,highlight\nPe".to_vec();
        bytes.push(0xf1);
        bytes.extend_from_slice(b"asquito,300,720,1\nB,200,20,0\n");
        fs::write(&input, bytes).unwrap();

        let report = load_input(&input);
        assert_eq!(report.records.len(), 2);
        let name = &report.records[1].name;
        assert!(name.starts_with("Pe") && name.ends_with("asquito"));
        assert!(report.records[1].highlight);
    }

    #[test]
    fn test_layout_csv_rows() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("mines.csv");
        fs::write(&input, SAMPLE).unwrap();
        let report = load_input(&input);
        let geometry = build_chart(&report.records, &ChartConfig::default(), None).unwrap();

        let out = dir.path().join("layout.csv");
        write_layout_csv(&geometry, &out).unwrap();
        let mut reader = csv::Reader::from_path(&out).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "sequence_id");
        assert_eq!(&headers[5], "cumulative_production");

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        let names: Vec<&str> = rows.iter().map(|r| &r[1]).collect();
        assert_eq!(names, vec!["C", "A", "B"]);
        let cumulative: Vec<&str> = rows.iter().map(|r| &r[5]).collect();
        assert_eq!(cumulative, vec!["0.000", "50.000", "150.000"]);
        assert_eq!(&rows[2][4], "1");
        assert_eq!(&rows[0][0], "2");
    }

    #[test]
    fn test_geometry_json_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let report = parse_csv(SAMPLE);
        let geometry = build_chart(&report.records, &ChartConfig::default(), Some(12.0)).unwrap();
        let path = dir.path().join("geometry.json");
        write_geometry_json(&geometry, &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let back: ChartGeometry = serde_json::from_str(&text).unwrap();
        assert_eq!(back, geometry);
        assert!(text.contains("\"cumulative_production\""));
    }

    #[test]
    fn test_stats_summary() {
        let report = parse_csv(&format!("{}D,10,4\nE,0,3,0\n", SAMPLE));
        let mut out = Vec::new();
        write_stats(&report, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("kept: 3"));
        assert!(text.contains("dropped: 2 (short 1, invalid 1)"));
        assert!(text.contains("total_production: 350.000"));
        assert!(text.contains("weighted_average_cost: 13.571"));
        assert!(text.contains("quartiles: q1=5.000 median=10.000 q3=20.000"));
    }

    #[test]
    fn test_stats_summary_empty() {
        let mut out = Vec::new();
        write_stats(&ParseReport::default(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("weighted_average_cost: n/a"));
    }
}
