//! 产出存在性探测
//!
//! 对账清理用：判断某个 (symbol, region, report_type) 是否已有有效产出文件。
//! 产出目录布局为 `<location>/<region>/<symbol>/<report_type>.json`。

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crawler_core::{CrawlerResult, OutputProbe};

pub struct FsOutputProbe;

impl FsOutputProbe {
    pub fn new() -> Self {
        Self
    }

    fn output_path(location: &str, symbol: &str, region: &str, report_type: &str) -> PathBuf {
        Path::new(location)
            .join(region)
            .join(symbol)
            .join(format!("{report_type}.json"))
    }
}

impl Default for FsOutputProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutputProbe for FsOutputProbe {
    async fn output_exists(
        &self,
        location: &str,
        symbol: &str,
        region: &str,
        report_type: &str,
    ) -> CrawlerResult<bool> {
        let path = Self::output_path(location, symbol, region, report_type);
        match tokio::fs::metadata(&path).await {
            // 零字节文件视为无效产出
            Ok(meta) => Ok(meta.is_file() && meta.len() > 0),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_output_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let probe = FsOutputProbe::new();
        let exists = probe
            .output_exists(dir.path().to_str().unwrap(), "2330", "TPE", "income")
            .await
            .unwrap();
        assert!(!exists);
    }

    #[tokio::test]
    async fn test_non_empty_output_is_present() {
        let dir = tempfile::tempdir().unwrap();
        let location = dir.path().to_str().unwrap().to_string();
        let path = FsOutputProbe::output_path(&location, "2330", "TPE", "income");
        tokio::fs::create_dir_all(path.parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(&path, b"{\"rows\":[]}").await.unwrap();

        let probe = FsOutputProbe::new();
        assert!(probe
            .output_exists(&location, "2330", "TPE", "income")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_empty_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let location = dir.path().to_str().unwrap().to_string();
        let path = FsOutputProbe::output_path(&location, "2330", "TPE", "income");
        tokio::fs::create_dir_all(path.parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(&path, b"").await.unwrap();

        let probe = FsOutputProbe::new();
        assert!(!probe
            .output_exists(&location, "2330", "TPE", "income")
            .await
            .unwrap());
    }
}
