use clap::Parser;

use crate::cli::{SubCommandExtend, open_search};
use crate::config::{CatalogOptions, EmbedOptions, Opts, OutputFormat};

#[derive(Parser, Debug, Clone)]
pub struct StatsCommand {
    #[command(flatten)]
    pub embed: EmbedOptions,
    #[command(flatten)]
    pub catalog: CatalogOptions,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", value_enum, default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for StatsCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let db = open_search(opts, &self.embed, &self.catalog.image_dir, &self.catalog.suffix).await?;
        let stats = db.get_index_stats().await?;
        match self.output_format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
            OutputFormat::Table => {
                println!("图片总数: {}", stats.total_images);
                println!("语义向量: {}", stats.with_clip);
                println!("颜色向量: {}", stats.with_color);
                println!("语义向量维度: {}", stats.clip_dimension);
            }
        }
        Ok(())
    }
}
