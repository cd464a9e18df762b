mod add;
mod antipode;
mod radar;
mod search;
pub mod server;
mod stats;

pub use add::*;
pub use antipode::*;
pub use radar::*;
pub use search::*;
pub use server::*;
pub use stats::*;

use std::path::Path;

use anyhow::Result;

use crate::catalog::DirCatalog;
use crate::config::{EmbedOptions, Opts, OutputFormat};
use crate::db::SearchResult;
use crate::embed::ScriptEmbedder;
use crate::search::{VectorSearch, VectorSearchBuilder};

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}

/// 命令行使用的搜索服务
pub type CliSearch = VectorSearch<ScriptEmbedder, DirCatalog>;

/// 按命令行参数打开搜索服务
pub async fn open_search(
    opts: &Opts,
    embed: &EmbedOptions,
    image_dir: &Path,
    suffix: &str,
) -> Result<CliSearch> {
    tokio::fs::create_dir_all(opts.conf_dir.path()).await?;
    let catalog = DirCatalog::open(image_dir, suffix)?;
    let db = VectorSearchBuilder::new(opts.conf_dir.database(), ScriptEmbedder::from(embed), catalog)
        .clip_dimension(embed.clip_dim)
        .open()
        .await?;
    Ok(db)
}

fn print_result(result: &[SearchResult], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result)?)
        }
        OutputFormat::Table => {
            for r in result {
                println!("{:.4}\t{}", r.score, r.image_id);
            }
        }
    }
    Ok(())
}
