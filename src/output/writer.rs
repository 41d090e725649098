//! Dataset persistence: JSON + CSV artifacts, written to temporary files and
//! atomically renamed into place, so a failure mid-write can never leave a
//! partially-written published file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use itertools::Itertools;

use crate::model::Dataset;

pub const JSON_FILE: &str = "games.json";
pub const CSV_FILE: &str = "games.csv";

pub struct WrittenArtifacts {
    pub json: PathBuf,
    pub csv: PathBuf,
}

/// Serialize both artifacts into `dir`, replacing the previous pair only
/// after both temp files are fully staged.
pub fn write_dataset(dataset: &Dataset, dir: &Path) -> Result<WrittenArtifacts> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output dir {}", dir.display()))?;

    let json_path = dir.join(JSON_FILE);
    let csv_path = dir.join(CSV_FILE);
    // Temp files live in the same directory so the rename stays on one
    // filesystem and therefore atomic.
    let json_tmp = dir.join(format!("{JSON_FILE}.tmp"));
    let csv_tmp = dir.join(format!("{CSV_FILE}.tmp"));

    let body = serde_json::to_string_pretty(dataset).context("dataset JSON serialization")?;
    fs::write(&json_tmp, body)
        .with_context(|| format!("failed to stage {}", json_tmp.display()))?;
    write_csv(&csv_tmp, dataset)
        .with_context(|| format!("failed to stage {}", csv_tmp.display()))?;

    fs::rename(&json_tmp, &json_path)
        .with_context(|| format!("failed to swap in {}", json_path.display()))?;
    fs::rename(&csv_tmp, &csv_path)
        .with_context(|| format!("failed to swap in {}", csv_path.display()))?;

    Ok(WrittenArtifacts {
        json: json_path,
        csv: csv_path,
    })
}

/// Reload the structured artifact. The display layer never calls this; it
/// exists so the round-trip guarantee is enforceable in tests and tooling.
pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let body = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&body).with_context(|| format!("failed to parse {}", path.display()))
}

fn write_csv(path: &Path, dataset: &Dataset) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "name",
        "price_regular",
        "price_discount",
        "discount_percent",
        "rating",
        "platforms",
        "howlongtobeat",
        "distribution_type",
        "site",
        "url",
        "image_url",
    ])?;
    for item in &dataset.items {
        writer.write_record([
            item.name.clone(),
            item.price_regular.to_string(),
            item.price_discount.map(|p| p.to_string()).unwrap_or_default(),
            item.discount_percent.to_string(),
            item.rating.map(|r| r.to_string()).unwrap_or_default(),
            item.platforms.iter().map(|p| p.as_str()).join(";"),
            item.howlongtobeat.map(|h| h.to_string()).unwrap_or_default(),
            item.distribution_type.as_str().to_string(),
            item.site.clone(),
            item.url.clone(),
            item.image_url.clone().unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
