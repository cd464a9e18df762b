//! 外部嵌入服务
//!
//! 语义向量由外部模型生成，这里只定义调用约定。`Ok(None)` 表示上游没有产生向量，
//! 而 `Err(SearchError::UpstreamFailure)` 表示调用本身失败（进程错误、超时等）。

use std::future::Future;
use std::process::Stdio;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::{debug, warn};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::EmbedOptions;
use crate::error::{Result, SearchError};

pub trait EmbeddingProvider: Send + Sync {
    /// 计算图片的语义向量
    fn embed_image(&self, image: &[u8]) -> impl Future<Output = Result<Option<Vec<f32>>>> + Send;

    /// 计算文本的语义向量
    fn embed_text(&self, text: &str) -> impl Future<Output = Result<Option<Vec<f32>>>> + Send;
}

#[derive(Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
enum EmbedRequest<'a> {
    Image {
        #[serde(rename = "imageBase64")]
        image_base64: String,
    },
    Text {
        text: &'a str,
    },
}

/// 通过外部脚本计算向量
///
/// 每次调用启动一个子进程，通过 stdin 写入一个 JSON 请求，从 stdout 读取 JSON 数组，
/// 超时后子进程会被杀死。
#[derive(Debug, Clone)]
pub struct ScriptEmbedder {
    program: Option<(String, Vec<String>)>,
    timeout: Duration,
}

impl ScriptEmbedder {
    /// `command` 为完整的命令行，按空白分割
    pub fn new(command: Option<&str>, timeout: Duration) -> Self {
        let program = command.and_then(|cmd| {
            let mut parts = cmd.split_whitespace().map(str::to_string);
            parts.next().map(|program| (program, parts.collect()))
        });
        Self { program, timeout }
    }

    pub fn is_configured(&self) -> bool {
        self.program.is_some()
    }

    async fn call(&self, request: EmbedRequest<'_>) -> Result<Option<Vec<f32>>> {
        let Some((program, args)) = &self.program else {
            return Err(SearchError::UpstreamFailure("未配置嵌入命令".to_string()));
        };
        let payload = serde_json::to_vec(&request)
            .map_err(|e| SearchError::UpstreamFailure(format!("序列化请求失败: {e}")))?;

        let upstream = |e: std::io::Error| SearchError::UpstreamFailure(format!("{program}: {e}"));
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(upstream)?;

        let run = async {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(&payload).await?;
                // 关闭 stdin，脚本才能读到 EOF
                drop(stdin);
            }
            child.wait_with_output().await
        };

        let output = match tokio::time::timeout(self.timeout, run).await {
            Ok(output) => output.map_err(upstream)?,
            Err(_) => {
                warn!("嵌入命令超时: {:?}", self.timeout);
                return Err(SearchError::UpstreamFailure(format!(
                    "嵌入命令超时（{}s）",
                    self.timeout.as_secs_f32()
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SearchError::UpstreamFailure(format!(
                "嵌入命令退出码 {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        parse_output(&output.stdout)
    }
}

/// 解析脚本输出，`null` 或空数组表示没有结果
fn parse_output(stdout: &[u8]) -> Result<Option<Vec<f32>>> {
    let vector: Option<Vec<f32>> = serde_json::from_slice(stdout)
        .map_err(|e| SearchError::UpstreamFailure(format!("无法解析嵌入结果: {e}")))?;
    match vector {
        Some(v) if v.is_empty() => Ok(None),
        Some(v) if v.iter().any(|x| !x.is_finite()) => {
            Err(SearchError::UpstreamFailure("嵌入结果包含非法值".to_string()))
        }
        v => {
            debug!("嵌入结果维度: {:?}", v.as_ref().map(Vec::len));
            Ok(v)
        }
    }
}

impl From<&EmbedOptions> for ScriptEmbedder {
    fn from(opts: &EmbedOptions) -> Self {
        Self::new(opts.embed_cmd.as_deref(), Duration::from_secs(opts.embed_timeout))
    }
}

impl EmbeddingProvider for ScriptEmbedder {
    async fn embed_image(&self, image: &[u8]) -> Result<Option<Vec<f32>>> {
        self.call(EmbedRequest::Image { image_base64: STANDARD.encode(image) }).await
    }

    async fn embed_text(&self, text: &str) -> Result<Option<Vec<f32>>> {
        self.call(EmbedRequest::Text { text }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_format() {
        let req = EmbedRequest::Text { text: "a dark image" };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({"mode": "text", "text": "a dark image"}));

        let req = EmbedRequest::Image { image_base64: STANDARD.encode(b"abc") };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({"mode": "image", "imageBase64": "YWJj"}));
    }

    #[test]
    fn test_parse_output() {
        assert_eq!(parse_output(b"[1.0, 2.5]").unwrap(), Some(vec![1.0, 2.5]));
        assert_eq!(parse_output(b"null").unwrap(), None);
        assert_eq!(parse_output(b"[]").unwrap(), None);
        assert!(parse_output(b"oops").is_err());
    }

    #[tokio::test]
    async fn test_unconfigured() {
        let embedder = ScriptEmbedder::new(None, Duration::from_secs(1));
        assert!(!embedder.is_configured());
        let result = embedder.embed_text("hello").await;
        assert!(matches!(result, Err(SearchError::UpstreamFailure(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_script_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("embed.sh");
        std::fs::write(&script, "cat > /dev/null\necho '[0.5, 0.25]'\n").unwrap();

        let cmd = format!("sh {}", script.display());
        let embedder = ScriptEmbedder::new(Some(&cmd), Duration::from_secs(10));
        assert_eq!(embedder.embed_text("hello").await.unwrap(), Some(vec![0.5, 0.25]));
        assert_eq!(embedder.embed_image(b"\x89PNG").await.unwrap(), Some(vec![0.5, 0.25]));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_script_failure() {
        let embedder = ScriptEmbedder::new(Some("false"), Duration::from_secs(10));
        let result = embedder.embed_text("hello").await;
        assert!(matches!(result, Err(SearchError::UpstreamFailure(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_script_timeout() {
        let embedder = ScriptEmbedder::new(Some("sleep 5"), Duration::from_millis(100));
        let result = embedder.embed_text("hello").await;
        assert!(matches!(result, Err(SearchError::UpstreamFailure(_))));
    }
}
