use std::env;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

use log::{error, info, warn};

use clan_card::{
    MissingAvatars, RenderConfig, Renderer, ReportRequest, encode_jpeg, encode_png,
};

const USAGE: &str = "usage: clan-card <request.json> <output.(png|jpg)>";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Png,
    Jpeg,
}

impl OutputFormat {
    fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }
}

fn main() {
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        error!("{err}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let mut args = env::args_os().skip(1);
    let (Some(request_path), Some(output_path), None) = (args.next(), args.next(), args.next())
    else {
        return Err(USAGE.into());
    };
    let request_path = PathBuf::from(request_path);
    let output_path = PathBuf::from(output_path);
    let format = OutputFormat::from_path(&output_path)
        .ok_or_else(|| format!("unsupported output extension: {}", output_path.display()))?;

    let raw = fs::read_to_string(&request_path)
        .map_err(|err| format!("failed to read {}: {err}", request_path.display()))?;
    let request: ReportRequest = serde_json::from_str(&raw)
        .map_err(|err| format!("invalid request {}: {err}", request_path.display()))?;
    if let Some(boss) = request.bosses.iter().find(|boss| boss.max_hp <= 0) {
        return Err(format!("boss '{}' has non-positive max_hp {}", boss.name, boss.max_hp).into());
    }

    let config = RenderConfig::from_env();
    info!(
        "rendering {} boss(es) with font {}",
        request.bosses.len(),
        config.font_path.display()
    );
    let renderer = Renderer::from_config(&config)?;
    let missing = MissingAvatars::new();
    let started_at = Instant::now();

    let summary = request
        .summary
        .as_ref()
        .map(|summary| {
            renderer.render_progress_summary(&summary.stats, &summary.categorized_chips, &missing)
        })
        .transpose()?;
    let report =
        renderer.render_combined_report(&request.bosses, summary.as_ref(), None, &missing)?;

    let bytes = match format {
        OutputFormat::Png => encode_png(&report)?,
        OutputFormat::Jpeg => encode_jpeg(&report, config.jpeg_quality)?,
    };
    fs::write(&output_path, &bytes)
        .map_err(|err| format!("failed to write {}: {err}", output_path.display()))?;
    info!(
        "wrote {} ({}x{}, {} bytes) in {}ms",
        output_path.display(),
        report.width(),
        report.height(),
        bytes.len(),
        started_at.elapsed().as_millis()
    );

    let missing = missing.drain();
    if !missing.is_empty() {
        warn!("{} avatar(s) missing", missing.len());
        println!("{}", serde_json::to_string(&missing)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_follows_extension() {
        assert_eq!(OutputFormat::from_path(Path::new("a.PNG")), Some(OutputFormat::Png));
        assert_eq!(OutputFormat::from_path(Path::new("a.jpeg")), Some(OutputFormat::Jpeg));
        assert_eq!(OutputFormat::from_path(Path::new("a.gif")), None);
        assert_eq!(OutputFormat::from_path(Path::new("report")), None);
    }
}
