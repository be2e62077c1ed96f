//! Output formatting for summaries and missions.
//!
//! Supports plain-text reports, an HTML page and tab-separated export.

use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::error::Result;
use crate::mission::Mission;
use crate::stats::Summary;
use crate::transport::TRANSPORT_MODES;

fn format_date(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
}

fn count_lines(out: &mut Vec<String>, title: &str, counts: &BTreeMap<String, usize>) {
    out.push(format!("=== {title} ==="));
    for (name, count) in counts {
        out.push(format!("{name:<10} {count}"));
    }
}

/// Plain-text report of `summary`, one entry per line.
///
/// Per-mode columns are executed, planned and all.
pub fn summary_lines(summary: &Summary, cities: bool, countries: bool) -> Vec<String> {
    let mut out = vec![
        format!("missions:    {:4} (executed)", summary.executed.missions),
        format!("missions:    {:4} (planned)", summary.planned.missions),
        format!("missions:    {:4} (all)", summary.all.missions),
        format!(
            "time period: {} -> {}",
            format_date(summary.start),
            format_date(summary.stop)
        ),
    ];

    if cities {
        count_lines(&mut out, "cities", &summary.cities);
    }
    if countries {
        count_lines(&mut out, "countries", &summary.countries);
    }

    let buckets = [&summary.executed, &summary.planned, &summary.all];

    out.push("=== transport ===".to_string());
    for mode in TRANSPORT_MODES {
        let [e, p, a] = buckets.map(|b| b.count(mode));
        out.push(format!("{mode:<10} {e:5} {p:5} {a:5}"));
    }

    out.push("=== distances ===".to_string());
    for mode in TRANSPORT_MODES {
        let [e, p, a] = buckets.map(|b| b.km(mode));
        out.push(format!("{mode:<10} {e:8} km {p:8} km {a:8} km"));
    }

    out.push("=== CO2 ===".to_string());
    for mode in TRANSPORT_MODES {
        let [e, p, a] = buckets.map(|b| b.co2_kg(mode));
        out.push(format!("{mode:<10} {e:10.1} kg {p:10.1} kg {a:10.1} kg"));
    }
    let [e, p, a] = buckets.map(|b| b.total_co2_kg());
    out.push(format!("{:<10} {e:10.1} kg {p:10.1} kg {a:10.1} kg", "total"));

    out
}

/// Logs the plain-text report of `summary`.
pub fn print_summary(summary: &Summary, cities: bool, countries: bool) {
    for line in summary_lines(summary, cities, countries) {
        info!("{line}");
    }
}

/// Standalone HTML page presenting `summary`.
pub fn summary_html(summary: &Summary) -> String {
    let mut out = vec![
        "<!DOCTYPE html>\n<html>\n<head><title>Eco missions</title></head>\n<body>".to_string(),
        "<h3>Stats</h3>\n<pre>".to_string(),
        format!("missions:    {} (executed)", summary.executed.missions),
        format!("missions:    {} (planned)", summary.planned.missions),
        format!(
            "time period: {} -> {}",
            format_date(summary.start),
            format_date(summary.stop)
        ),
        "</pre>".to_string(),
    ];

    out.push("<h3>Transport</h3>\n<pre>".to_string());
    for mode in TRANSPORT_MODES {
        out.push(format!("{mode:<10} {:4}", summary.all.count(mode)));
    }
    out.push("</pre>".to_string());

    out.push("<h3>Distances</h3>\n<pre>".to_string());
    for mode in TRANSPORT_MODES {
        out.push(format!(
            "{mode:<10} {:6} km {:10.1} kg CO2",
            summary.all.km(mode),
            summary.all.co2_kg(mode)
        ));
    }
    out.push("</pre>\n</body>\n</html>\n".to_string());

    out.join("\n")
}

/// One exported mission row.
#[derive(Serialize)]
struct ExportRow<'a> {
    id: i32,
    date: chrono::NaiveDate,
    transport: &'a str,
    dist_km: i64,
    co2_kg: f64,
    dest: &'a str,
    dest_lat: f64,
    dest_lng: f64,
}

impl<'a> From<&'a Mission> for ExportRow<'a> {
    fn from(m: &'a Mission) -> Self {
        Self {
            id: m.id,
            date: m.date,
            transport: m.mode.name(),
            dist_km: m.km(),
            co2_kg: crate::transport::co2_grams(m.mode, m.km()) / 1000.0,
            dest: &m.dest.name,
            dest_lat: m.dest.lat,
            dest_lng: m.dest.lng,
        }
    }
}

/// Writes `missions` as tab-separated rows, with a header, sorted by id.
pub fn write_missions<W: Write>(writer: W, missions: &[Mission]) -> Result<()> {
    let mut sorted: Vec<&Mission> = missions.iter().collect();
    sorted.sort_by_key(|m| m.id);

    let mut wtr = WriterBuilder::new().delimiter(b'\t').from_writer(writer);
    for m in sorted {
        wtr.serialize(ExportRow::from(m))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Exports `missions` to `path`, gzip-compressed when `gzip` is set.
pub fn export_missions(path: impl AsRef<Path>, missions: &[Mission], gzip: bool) -> Result<()> {
    let path = path.as_ref();
    debug!(path = %path.display(), gzip, missions = missions.len(), "Exporting missions");

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let file = File::create(path)?;

    if gzip {
        let mut encoder = GzEncoder::new(file, Compression::default());
        write_missions(&mut encoder, missions)?;
        encoder.finish()?;
    } else {
        write_missions(file, missions)?;
    }

    info!(path = %path.display(), missions = missions.len(), "Missions exported");
    Ok(())
}
