use clap::Parser;

use crate::cli::{SubCommandExtend, open_search, print_result};
use crate::config::{CatalogOptions, DomainArg, EmbedOptions, Opts, OutputFormat, SearchOptions};

#[derive(Parser, Debug, Clone)]
pub struct AntipodeCommand {
    #[command(flatten)]
    pub embed: EmbedOptions,
    #[command(flatten)]
    pub search: SearchOptions,
    #[command(flatten)]
    pub catalog: CatalogOptions,
    /// 源图片 ID
    pub image: String,
    /// 搜索域
    #[arg(long, value_enum, default_value_t = DomainArg::Clip)]
    pub domain: DomainArg,
    /// 反向方法
    /// clip: negate, stranger, otherwise, reflectroid
    /// color: complementary, histogram, lightness, negative
    #[arg(short, long, verbatim_doc_comment)]
    pub method: String,
}

impl SubCommandExtend for AntipodeCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let db = open_search(opts, &self.embed, &self.catalog.image_dir, &self.catalog.suffix).await?;
        let count = self.search.count as usize;
        let response = db.antipode(&self.image, self.domain.into(), &self.method, count).await?;

        match self.search.output_format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
            OutputFormat::Table => {
                println!("# {}: {}", response.label, response.description);
                print_result(&response.results, OutputFormat::Table)?;
            }
        }
        Ok(())
    }
}
