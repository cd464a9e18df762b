use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use indicatif::ProgressBar;
use log::{info, warn};

use crate::catalog::ImageCatalog;
use crate::cli::{SubCommandExtend, open_search};
use crate::config::{EmbedOptions, KindArg, Opts};
use crate::search::BatchOptions;
use crate::utils::pb_style;

#[derive(Parser, Debug, Clone)]
pub struct AddCommand {
    #[command(flatten)]
    pub embed: EmbedOptions,
    /// 图片所在目录，图片 ID 为相对该目录的路径
    pub path: PathBuf,
    /// 扫描的文件后缀名，多个后缀用逗号分隔
    #[arg(short, long, default_value = "jpg,jpeg,png,webp,gif,ppm")]
    pub suffix: String,
    /// 需要生成的向量类型
    #[arg(long, value_enum, default_value_t = KindArg::All)]
    pub kind: KindArg,
    /// 已有向量的图片也重新生成
    #[arg(long)]
    pub force: bool,
    /// 每处理一张图片后等待的毫秒数
    #[arg(long, value_name = "MS", default_value_t = 200)]
    pub delay_ms: u64,
}

impl SubCommandExtend for AddCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let db = open_search(opts, &self.embed, &self.path, &self.suffix).await?;
        let images = db.catalog().list_images().await?;
        let batch = BatchOptions {
            kinds: self.kind.kinds(),
            force: self.force,
            delay: Duration::from_millis(self.delay_ms),
        };

        let pb = ProgressBar::new(images.len() as u64).with_style(pb_style());
        let results = db
            .generate_embeddings(&images, &batch, |item| {
                if item.skipped {
                    pb.set_message(format!("跳过图片: {}", item.image_id));
                } else if let Some(e) = &item.error {
                    pb.println(format!("处理失败 {}: {}", item.image_id, e));
                } else {
                    pb.set_message(item.image_id.clone());
                }
                pb.inc(1);
            })
            .await?;
        pb.finish_with_message("图片添加完成");

        let failed = results.iter().filter(|r| !r.success).count();
        let skipped = results.iter().filter(|r| r.skipped).count();
        if failed > 0 {
            warn!("{failed} 张图片处理失败");
        }
        info!("共 {} 张图片，跳过 {skipped}，失败 {failed}", results.len());
        Ok(())
    }
}
