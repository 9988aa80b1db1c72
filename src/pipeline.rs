use crate::config::Config;
use crate::fetcher::MetadataSource;
use crate::loader;
use crate::rarity;
use crate::report::{self, RankedReport};
use crate::traits;

use anyhow::Result;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct RunSummary {
    pub collection_name: String,
    pub items_loaded: usize,
    pub items_ranked: usize,
    pub report_path: PathBuf,
}

/// Load, aggregate, score, rank and write the report into `output_dir`.
pub fn run(cfg: &Config, source: &dyn MetadataSource, output_dir: &Path) -> Result<RunSummary> {
    let metadata = loader::load(cfg, source)?;
    let collection_name = report::collection_name(&metadata);

    let counts = traits::aggregate(&metadata);
    let records = rarity::score(&metadata, &counts, cfg.total_nfts);
    let report = RankedReport::build(report::rank(records), &collection_name);
    let report_path = report.write_to(output_dir)?;

    log::info!("NFT rarity rankings have been saved to '{}'", report_path.display());

    Ok(RunSummary {
        collection_name,
        items_loaded: metadata.len(),
        items_ranked: report.len(),
        report_path,
    })
}
