use anyhow::{Context, Result};
use clap::Parser;
use nft_rarity_rank::config::Config;
use nft_rarity_rank::loader::read_cache_dir;
use nft_rarity_rank::metadata::NftMetadata;
use nft_rarity_rank::traits::aggregate;
use std::path::PathBuf;

/// ローカルにキャッシュしたメタデータの属性分布を表示する
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// 設定ファイル (JSON または YAML)。folder_path を走査する
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// 設定の代わりにこのフォルダを走査する
    #[arg(short, long)]
    folder: Option<PathBuf>,
}

fn main() -> Result<()> {
    let env = env_logger::Env::default().filter_or("RUST_LOG", "warn");
    env_logger::Builder::from_env(env).format_timestamp(None).init();

    let args = Args::parse();
    let metadata_dir = match args.folder {
        Some(folder) => folder,
        None => {
            Config::load(&args.config)
                .with_context(|| format!("設定ファイルの読み込みに失敗しました: {}", args.config.display()))?
                .folder_path
        }
    };

    let items: Vec<NftMetadata> = read_cache_dir(&metadata_dir)
        .with_context(|| format!("metadata ディレクトリが読めません: {:?}", metadata_dir))?
        .into_iter()
        .map(|(_, m)| m)
        .collect();
    let total = items.len();
    let counts = aggregate(&items);

    println!("==============================");
    println!(" NFT Trait Distribution");
    println!(" Folder: {}", metadata_dir.display());
    println!(" Total tokens: {}", total);
    println!(" Distinct traits: {}", counts.len());
    println!("==============================\n");

    for (trait_type, values) in counts.by_trait_type() {
        println!("▶ Trait: {}", trait_type);
        for (value, count) in values {
            let ratio = count as f64 / total as f64 * 100.0;
            println!("  {:30} {:5} ({:.2}%)", value, count, ratio);
        }
        println!();
    }

    Ok(())
}
