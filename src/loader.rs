//! Metadata acquisition with an on-disk cache.
//!
//! Each token lands in `<folder_path>/metadata_<id>.json`. A folder that
//! already holds the full set is read back without touching the network.

use crate::config::Config;
use crate::fetcher::{fetch_and_persist, MetadataSource};
use crate::metadata::NftMetadata;

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Degree of the fetch pool. Independent of `batch_size`.
pub const FETCH_WORKERS: usize = 8;

const FILE_PREFIX: &str = "metadata_";
const FILE_EXTENSION: &str = "json";

pub fn metadata_path(folder: &Path, id: u64) -> PathBuf {
    folder.join(format!("{FILE_PREFIX}{id}.{FILE_EXTENSION}"))
}

/// Loads metadata for every id in the configured range.
///
/// The result is in ascending id order. Ids whose fetch fails are absent.
pub fn load(cfg: &Config, source: &dyn MetadataSource) -> Result<Vec<NftMetadata>> {
    if cache_is_complete(cfg)? {
        log::info!("metadata already downloaded, skipping download step");
        return read_cached(cfg);
    }

    fs::create_dir_all(&cfg.folder_path).with_context(|| {
        format!("failed to create metadata folder: {}", cfg.folder_path.display())
    })?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(FETCH_WORKERS)
        .build()
        .context("failed to build fetch worker pool")?;

    let folder = cfg.folder_path.as_path();
    let batches = batches(cfg.fetch_range(), cfg.batch_size);

    let metadata = pool.install(|| {
        batches
            .into_par_iter()
            .flat_map(|batch| {
                batch
                    .into_par_iter()
                    .filter_map(move |id| fetch_and_persist(source, id, &metadata_path(folder, id)))
            })
            .collect::<Vec<_>>()
    });

    log::info!(
        "downloaded {} of {} metadata documents",
        metadata.len(),
        cfg.total_nfts
    );

    Ok(metadata)
}

/// True when the folder holds exactly `total_nfts` entries and each expected
/// per-id file is among them.
pub fn cache_is_complete(cfg: &Config) -> Result<bool> {
    let folder = &cfg.folder_path;
    if !folder.is_dir() {
        return Ok(false);
    }

    let mut entries = 0u64;
    for entry in WalkDir::new(folder).min_depth(1).max_depth(1) {
        entry.with_context(|| format!("failed to list metadata folder: {}", folder.display()))?;
        entries += 1;
    }

    if entries != cfg.total_nfts {
        return Ok(false);
    }

    if let Some(missing) = cfg
        .fetch_range()
        .find(|&id| !metadata_path(folder, id).is_file())
    {
        log::warn!(
            "{} holds {entries} entries but {} is missing; downloading again",
            folder.display(),
            metadata_path(folder, missing).display()
        );
        return Ok(false);
    }

    Ok(true)
}

/// Reads every expected per-id file back in id order.
pub fn read_cached(cfg: &Config) -> Result<Vec<NftMetadata>> {
    cfg.fetch_range()
        .map(|id| read_metadata_file(&metadata_path(&cfg.folder_path, id)))
        .collect()
}

fn read_metadata_file(path: &Path) -> Result<NftMetadata> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read cached metadata: {}", path.display()))?;
    let metadata = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse cached metadata: {}", path.display()))?;
    log::debug!("read {}", path.display());
    Ok(metadata)
}

/// Every `metadata_*.json` in `dir`, whatever its id. Unreadable files are
/// skipped with a warning.
pub fn read_cache_dir(dir: &Path) -> Result<Vec<(PathBuf, NftMetadata)>> {
    if !dir.is_dir() {
        anyhow::bail!("metadata folder does not exist: {}", dir.display());
    }

    let mut items = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.into_path();
        if !is_metadata_file(&path) {
            continue;
        }

        match read_metadata_file(&path) {
            Ok(m) => items.push((path, m)),
            Err(err) => log::warn!("skipping {}: {err:#}", path.display()),
        }
    }
    Ok(items)
}

fn is_metadata_file(path: &Path) -> bool {
    let stem_matches = path
        .file_name()
        .and_then(|s| s.to_str())
        .is_some_and(|name| name.starts_with(FILE_PREFIX));
    let ext_matches = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(FILE_EXTENSION));
    stem_matches && ext_matches
}

/// Splits the id range into submission chunks of at most `size` ids.
fn batches(range: Range<u64>, size: usize) -> Vec<Range<u64>> {
    let size = size.max(1) as u64;
    let mut out = Vec::new();
    let mut start = range.start;
    while start < range.end {
        let end = range.end.min(start.saturating_add(size));
        out.push(start..end);
        start = end;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Counting {
        calls: AtomicUsize,
        fail_on: Option<u64>,
    }

    impl Counting {
        fn new(fail_on: Option<u64>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on,
            }
        }
    }

    impl MetadataSource for Counting {
        fn fetch(&self, id: u64) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on == Some(id) {
                bail!("GET /{id} returned 500 Internal Server Error");
            }
            Ok(format!(
                r#"{{"name":"Test #{id}","attributes":[{{"trait_type":"Kind","value":"K{}"}}]}}"#,
                id % 2
            ))
        }
    }

    fn config(folder: &Path, total: u64, batch: usize) -> Config {
        Config {
            base_url: "http://localhost".to_string(),
            total_nfts: total,
            folder_path: folder.to_path_buf(),
            start_id: 1,
            batch_size: batch,
            request_timeout_secs: 1,
        }
    }

    #[test]
    fn batches_cover_range_without_overlap() {
        assert_eq!(batches(1..8, 3), vec![1..4, 4..7, 7..8]);
        assert_eq!(batches(0..2, 10), vec![0..2]);
        assert!(batches(5..5, 3).is_empty());
    }

    #[test]
    fn downloads_in_id_order_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("cache");
        let cfg = config(&folder, 20, 3);
        let source = Counting::new(None);

        let items = load(&cfg, &source).unwrap();
        let names: Vec<_> = items.iter().map(|m| m.name.clone()).collect();
        let expected: Vec<_> = (1..=20).map(|i| format!("Test #{i}")).collect();
        assert_eq!(names, expected);
        assert_eq!(source.calls.load(Ordering::SeqCst), 20);
        for id in 1..=20 {
            assert!(metadata_path(&folder, id).is_file());
        }
    }

    #[test]
    fn failed_item_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), 5, 2);
        let source = Counting::new(Some(3));

        let items = load(&cfg, &source).unwrap();
        assert_eq!(items.len(), 4);
        assert!(items.iter().all(|m| m.name != "Test #3"));
        assert!(!metadata_path(dir.path(), 3).exists());
    }

    #[test]
    fn complete_cache_skips_network() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), 6, 4);

        let first = load(&cfg, &Counting::new(None)).unwrap();

        let second_source = Counting::new(None);
        let second = load(&cfg, &second_source).unwrap();
        assert_eq!(second_source.calls.load(Ordering::SeqCst), 0);
        assert_eq!(first, second);
    }

    #[test]
    fn count_match_with_wrong_ids_refetches() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), 2, 1);
        fs::write(metadata_path(dir.path(), 1), r#"{"name":"Test #1"}"#).unwrap();
        fs::write(metadata_path(dir.path(), 99), r#"{"name":"Test #99"}"#).unwrap();

        assert!(!cache_is_complete(&cfg).unwrap());

        let source = Counting::new(None);
        let items = load(&cfg, &source).unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn corrupt_cached_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), 1, 1);
        fs::write(metadata_path(dir.path(), 1), "not json").unwrap();

        let err = load(&cfg, &Counting::new(None)).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse cached metadata"));
    }

    #[test]
    fn reads_any_cached_ids_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(metadata_path(dir.path(), 4), r#"{"name":"Test #4"}"#).unwrap();
        fs::write(metadata_path(dir.path(), 9), "broken").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        let items = read_cache_dir(dir.path()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].1.name, "Test #4");
    }

    /// Tracks the largest number of `fetch` calls running at once.
    #[derive(Default)]
    struct PeakTracking {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl MetadataSource for PeakTracking {
        fn fetch(&self, id: u64) -> Result<String> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(format!(r#"{{"name":"Test #{id}"}}"#))
        }
    }

    #[test]
    fn pool_degree_is_fixed_whatever_the_batch_size() {
        for batch_size in [1, 1000] {
            let dir = tempfile::tempdir().unwrap();
            let cfg = config(dir.path(), 40, batch_size);
            let source = PeakTracking::default();

            let items = load(&cfg, &source).unwrap();
            assert_eq!(items.len(), 40);

            let peak = source.peak.load(Ordering::SeqCst);
            assert!(peak <= FETCH_WORKERS, "batch_size {batch_size}: peak {peak}");
            assert!(peak > 1, "batch_size {batch_size}: fetches never overlapped");
        }
    }
}
