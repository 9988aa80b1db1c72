use nft_rarity_rank::config::Config;
use nft_rarity_rank::fetcher::HttpSource;
use nft_rarity_rank::pipeline;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

/// NFT コレクションのトークンを属性のレア度でランキングする
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// 設定ファイル (JSON または YAML)
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// ランキングファイルの出力先ディレクトリ
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let cfg = Config::load(&args.config)
        .with_context(|| format!("設定ファイルの読み込みに失敗しました: {}", args.config.display()))?;
    let source = HttpSource::new(&cfg).context("HTTP クライアントの初期化に失敗しました")?;

    let summary = pipeline::run(&cfg, &source, &args.output_dir)
        .context("レア度ランキングの作成に失敗しました")?;

    println!(
        "✅ {}: {} / {} トークンをランキングしました (取得 {} 件) -> {}",
        summary.collection_name,
        summary.items_ranked,
        cfg.total_nfts,
        summary.items_loaded,
        summary.report_path.display()
    );

    Ok(())
}

fn init_logging() {
    let env = env_logger::Env::default().filter_or("RUST_LOG", "info");
    env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_module_path(false)
        .init();
}
