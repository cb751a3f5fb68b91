use std::env;
use std::path::Path;
use serde_json::json;
use tracing_subscriber::{fmt, EnvFilter};
use rastermesh::{AigGrid, Config, Error, LayerKind, Result, SelafinDataset};
use rastermesh::formats::aig::LocalFileSystem;

fn describe_grid(path: &Path, config: &Config) -> Result<serde_json::Value> {
    let fs = LocalFileSystem::new(config.grid.use_mmap);
    let mut grid = AigGrid::open_with(path, &config.grid, Box::new(fs))?;

    let info = grid.info().clone();
    let center = grid.cell_value(info.pixels / 2, info.lines / 2)?;
    let summary = json!({
        "format": "aig",
        "info": info,
        "geo_transform": grid.geo_transform(),
        "center_value": center,
        "failed_openings": grid.failed_openings(),
    });
    grid.close();
    Ok(summary)
}

fn describe_mesh(path: &Path, config: &Config) -> Result<serde_json::Value> {
    let mut dataset = SelafinDataset::open(path, false, &config.selafin)?;
    let header = dataset.header().clone();

    let mut steps = Vec::new();
    for step in 0..dataset.step_count() {
        steps.push(json!({
            "time": dataset.step_date(step)?,
            "points_layer": dataset.layer_name(step, LayerKind::Points),
            "elements_layer": dataset.layer_name(step, LayerKind::Elements),
        }));
    }

    Ok(json!({
        "format": "selafin",
        "title": header.title(),
        "variables": header.variables(),
        "points": header.point_count(),
        "elements": header.element_count(),
        "points_per_element": header.points_per_element(),
        "extent": header.bounding_box(),
        "steps": steps,
    }))
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).init();

    let mut args = env::args().skip(1);
    let Some(target) = args.next() else {
        eprintln!("usage: rastermesh <cover-dir|hdr.adf|file.slf> [config.json]");
        std::process::exit(2);
    };
    let config = match args.next() {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };

    let path = Path::new(&target);
    let is_mesh = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("slf"));

    let summary = if is_mesh {
        describe_mesh(path, &config)?
    } else {
        describe_grid(path, &config)?
    };

    let text = serde_json::to_string_pretty(&summary)
        .map_err(|e| Error::InvalidFormat(format!("summary: {}", e)))?;
    println!("{}", text);
    Ok(())
}
