use anyhow::bail;
use clap::Parser;

use crate::cli::{SubCommandExtend, open_search, print_result};
use crate::config::{CatalogOptions, DomainArg, EmbedOptions, Opts, OutputFormat, SearchOptions};

#[derive(Parser, Debug, Clone)]
pub struct SearchCommand {
    #[command(flatten)]
    pub embed: EmbedOptions,
    #[command(flatten)]
    pub search: SearchOptions,
    #[command(flatten)]
    pub catalog: CatalogOptions,
    /// 被搜索的图片 ID
    pub image: Option<String>,
    /// 搜索域
    #[arg(long, value_enum, default_value_t = DomainArg::Clip)]
    pub domain: DomainArg,
    /// 按文本搜索
    #[arg(long, conflicts_with_all = ["image", "hex"])]
    pub text: Option<String>,
    /// 按颜色搜索，格式为 #rrggbb
    #[arg(long, conflicts_with = "image")]
    pub hex: Option<String>,
}

impl SubCommandExtend for SearchCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let db = open_search(opts, &self.embed, &self.catalog.image_dir, &self.catalog.suffix).await?;
        let count = self.search.count as usize;
        let format = self.search.output_format;

        if let Some(text) = &self.text {
            return print_result(&db.text_search(text, count).await?, format);
        }
        if let Some(hex) = &self.hex {
            return print_result(&db.color_search(hex, count).await?, format);
        }
        let Some(image) = &self.image else {
            bail!("需要指定图片 ID、--text 或 --hex");
        };

        let strangers = self.search.strangers as usize;
        let response = db.similar(image, self.domain.into(), count, strangers).await?;
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
            OutputFormat::Table => {
                print_result(&response.results, format)?;
                if !response.strangers.is_empty() {
                    println!("# 陌生图片");
                    print_result(&response.strangers, format)?;
                }
            }
        }
        Ok(())
    }
}
