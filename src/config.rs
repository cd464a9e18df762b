use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use clap::{Parser, Subcommand, ValueEnum};
use directories::ProjectDirs;

use crate::cli::*;
use crate::search::{Domain, EmbeddingKind};

static CONF_DIR: LazyLock<ConfDir> = LazyLock::new(|| {
    let path = ProjectDirs::from("", "antipode", "antipode")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".antipode"));
    ConfDir { path }
});

fn default_config_dir() -> &'static str {
    CONF_DIR.path().to_str().unwrap_or(".antipode")
}

#[derive(Parser, Debug, Clone)]
pub struct EmbedOptions {
    /// 计算语义向量的外部命令，通过 stdin/stdout 交换 JSON
    /// 例：--embed-cmd 'python3 scripts/clip_embed.py'
    #[arg(long, value_name = "COMMAND", verbatim_doc_comment)]
    pub embed_cmd: Option<String>,
    /// 外部命令的超时时间，单位为秒
    #[arg(long, value_name = "SECONDS", default_value_t = 60)]
    pub embed_timeout: u64,
    /// 语义向量维度，同一个索引中保持不变
    #[arg(long, value_name = "DIM", default_value_t = 512)]
    pub clip_dim: usize,
}

#[derive(Parser, Debug, Clone)]
pub struct CatalogOptions {
    /// 图片目录，用于读取图片内容和 tags.json 中的排除标签
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub image_dir: PathBuf,
    /// 扫描的文件后缀名，多个后缀用逗号分隔
    #[arg(short, long, default_value = "jpg,jpeg,png,webp,gif,ppm")]
    pub suffix: String,
}

#[derive(Parser, Debug, Clone)]
pub struct SearchOptions {
    /// 返回的结果数量
    #[arg(long, value_name = "COUNT", default_value_t = 8, value_parser = clap::value_parser!(u16).range(1..=20))]
    pub count: u16,
    /// 相似搜索时额外返回的“陌生图片”数量，0 表示不返回
    #[arg(long, value_name = "N", default_value_t = 3, value_parser = clap::value_parser!(u16).range(0..=20))]
    pub strangers: u16,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", value_enum, default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "antipode", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// antipode 配置文件目录
    #[arg(short, long, default_value = default_config_dir())]
    pub conf_dir: ConfDir,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 为目录中的图片生成向量并写入索引
    Add(AddCommand),
    /// 相似搜索，支持图片、文本和颜色
    Search(SearchCommand),
    /// 反向搜索，寻找与图片“相反”的图片
    Antipode(AntipodeCommand),
    /// 查看图片的概念雷达，或由雷达坐标生成查询
    Radar(RadarCommand),
    /// 显示索引统计信息
    Stats(StatsCommand),
    /// 启动 HTTP 搜索服务
    Server(ServerCommand),
}

#[derive(Debug, Clone)]
pub struct ConfDir {
    path: PathBuf,
}

impl ConfDir {
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// 返回数据库文件的路径
    pub fn database(&self) -> PathBuf {
        self.path.join("antipode.db")
    }
}

impl FromStr for ConfDir {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self { path: PathBuf::from(s) })
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Table,
}

/// 命令行中的搜索域
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainArg {
    /// 语义
    Clip,
    /// 颜色
    Color,
}

impl From<DomainArg> for Domain {
    fn from(value: DomainArg) -> Self {
        match value {
            DomainArg::Clip => Domain::Clip,
            DomainArg::Color => Domain::Color,
        }
    }
}

/// 需要生成的向量类型
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindArg {
    Clip,
    Color,
    All,
}

impl KindArg {
    pub fn kinds(&self) -> Vec<EmbeddingKind> {
        match self {
            KindArg::Clip => vec![EmbeddingKind::Clip],
            KindArg::Color => vec![EmbeddingKind::Color],
            KindArg::All => vec![EmbeddingKind::Clip, EmbeddingKind::Color],
        }
    }
}
