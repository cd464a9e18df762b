use anyhow::bail;
use clap::Parser;

use crate::cli::{SubCommandExtend, open_search, print_result};
use crate::config::{CatalogOptions, EmbedOptions, Opts, OutputFormat, SearchOptions};

#[derive(Parser, Debug, Clone)]
pub struct RadarCommand {
    #[command(flatten)]
    pub embed: EmbedOptions,
    #[command(flatten)]
    pub search: SearchOptions,
    #[command(flatten)]
    pub catalog: CatalogOptions,
    /// 图片 ID，显示该图片在每条概念轴上的得分
    pub image: Option<String>,
    /// 雷达上的点，逗号分隔的 10 个分量，例：0.8,0,0,-0.5,0,0,0,0,0,0
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, conflicts_with = "image")]
    pub point: Option<Vec<f32>>,
}

impl SubCommandExtend for RadarCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let db = open_search(opts, &self.embed, &self.catalog.image_dir, &self.catalog.suffix).await?;
        let format = self.search.output_format;

        if let Some(point) = &self.point {
            let response = db.radar_query(point, self.search.count as usize).await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
                OutputFormat::Table => {
                    println!("# {}", response.query);
                    print_result(&response.results, format)?;
                }
            }
            return Ok(());
        }

        let Some(image) = &self.image else {
            bail!("需要指定图片 ID 或 --point");
        };
        let axes = db.concept_radar(image).await?;
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&axes)?),
            OutputFormat::Table => {
                for axis in axes {
                    println!("{:+.3}\t{} <-> {}", axis.display, axis.negative, axis.positive);
                }
            }
        }
        Ok(())
    }
}
