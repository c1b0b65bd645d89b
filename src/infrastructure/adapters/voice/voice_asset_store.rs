//! File Voice Asset Store - 文件系统音色目录同步
//!
//! 实现 VoiceAssetStorePort trait
//!
//! 目录结构: `{root_dir}/{voice_id}/{file_name}`

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use uuid::Uuid;

use crate::application::ports::{
    AssetFetcherPort, AssetSyncError, SyncReport, VoiceAssetStorePort,
};
use crate::domain::task::VoiceFile;

/// 下载中的临时文件前缀；隐藏文件名加随机后缀，不会与声明的文件重名
const PARTIAL_PREFIX: &str = ".voxq-download-";

/// 文件系统音色存储
pub struct FileVoiceAssetStore {
    /// 音色根目录
    root_dir: PathBuf,
    fetcher: Arc<dyn AssetFetcherPort>,
}

impl FileVoiceAssetStore {
    pub fn new(root_dir: impl AsRef<Path>, fetcher: Arc<dyn AssetFetcherPort>) -> Self {
        Self {
            root_dir: root_dir.as_ref().to_path_buf(),
            fetcher,
        }
    }

    /// 本地文件是否存在且哈希一致
    async fn is_current(&self, path: &Path, file: &VoiceFile) -> Result<bool, AssetSyncError> {
        match fs::metadata(path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Ok(false),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(io_error(&file.file_name, e)),
        }

        let data = fs::read(path)
            .await
            .map_err(|e| io_error(&file.file_name, e))?;
        let local_hash = content_hash(&data);
        let matches = hash_eq(&local_hash, &file.file_hash);

        tracing::debug!(
            file_name = %file.file_name,
            local_hash = %local_hash,
            expected_hash = %file.file_hash,
            matches = matches,
            "Checked existing voice file"
        );
        Ok(matches)
    }

    async fn download(&self, dir: &Path, file: &VoiceFile) -> Result<(), AssetSyncError> {
        tracing::info!(file_name = %file.file_name, url = %file.file_url, "Downloading voice file");

        let data = self
            .fetcher
            .fetch(&file.file_url)
            .await
            .map_err(|source| AssetSyncError::Download {
                file_name: file.file_name.clone(),
                source,
            })?;

        // 校验不通过的内容不落盘，已有的本地文件保持原样
        let downloaded_hash = content_hash(&data);
        if !hash_eq(&downloaded_hash, &file.file_hash) {
            tracing::warn!(
                file_name = %file.file_name,
                expected_hash = %file.file_hash,
                actual_hash = %downloaded_hash,
                "Downloaded voice file does not match declared hash"
            );
            return Err(AssetSyncError::HashMismatch {
                file_name: file.file_name.clone(),
                expected: file.file_hash.clone(),
                actual: downloaded_hash,
            });
        }

        // 先写临时文件再 rename，避免留下半截文件
        let target = dir.join(&file.file_name);
        let partial = dir.join(format!("{}{}.part", PARTIAL_PREFIX, Uuid::new_v4()));
        if let Err(e) = fs::write(&partial, &data).await {
            let _ = fs::remove_file(&partial).await;
            return Err(io_error(&file.file_name, e));
        }
        if let Err(e) = fs::rename(&partial, &target).await {
            let _ = fs::remove_file(&partial).await;
            return Err(io_error(&file.file_name, e));
        }

        tracing::debug!(file_name = %file.file_name, size = data.len(), "Voice file saved");
        Ok(())
    }

    /// 删除不在声明列表中的文件
    async fn prune(&self, dir: &Path, keep: &HashSet<&str>) -> Result<Vec<String>, AssetSyncError> {
        let prune_error = |e: std::io::Error| AssetSyncError::Prune {
            path: dir.display().to_string(),
            message: e.to_string(),
        };

        let mut removed = Vec::new();
        let mut entries = fs::read_dir(dir).await.map_err(prune_error)?;

        while let Some(entry) = entries.next_entry().await.map_err(prune_error)? {
            let name = entry.file_name().to_string_lossy().to_string();
            if keep.contains(name.as_str()) {
                continue;
            }

            let file_type = entry.file_type().await.map_err(prune_error)?;
            if file_type.is_dir() {
                tracing::warn!(name = %name, "Leaving unexpected sub-directory in voice directory");
                continue;
            }

            fs::remove_file(entry.path()).await.map_err(prune_error)?;
            tracing::info!(name = %name, "Removed stale voice file");
            removed.push(name);
        }

        removed.sort();
        Ok(removed)
    }
}

#[async_trait]
impl VoiceAssetStorePort for FileVoiceAssetStore {
    fn voice_dir(&self, voice_id: &str) -> PathBuf {
        self.root_dir.join(voice_id)
    }

    async fn sync(&self, voice_id: &str, files: &[VoiceFile]) -> Result<SyncReport, AssetSyncError> {
        let dir = self.voice_dir(voice_id);

        fs::create_dir_all(&dir)
            .await
            .map_err(|e| AssetSyncError::Directory {
                path: dir.display().to_string(),
                message: e.to_string(),
            })?;

        let mut report = SyncReport::default();

        for file in files {
            let path = dir.join(&file.file_name);
            if self.is_current(&path, file).await? {
                tracing::debug!(file_name = %file.file_name, "Voice file already up to date");
                report.reused.push(file.file_name.clone());
                continue;
            }

            self.download(&dir, file).await?;
            report.downloaded.push(file.file_name.clone());
        }

        let keep: HashSet<&str> = files.iter().map(|f| f.file_name.as_str()).collect();
        report.removed = self.prune(&dir, &keep).await?;

        tracing::debug!(
            voice_id = %voice_id,
            dir = %dir.display(),
            downloaded = report.downloaded.len(),
            reused = report.reused.len(),
            removed = report.removed.len(),
            "Voice directory synchronized"
        );

        Ok(report)
    }
}

/// 内容哈希（MD5 十六进制）
pub fn content_hash(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

fn hash_eq(actual: &str, expected: &str) -> bool {
    actual.eq_ignore_ascii_case(expected.trim())
}

fn io_error(file_name: &str, e: std::io::Error) -> AssetSyncError {
    AssetSyncError::IoError {
        file_name: file_name.to_string(),
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::FetchError;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// 内存下载器，记录每次请求
    #[derive(Default)]
    struct MapFetcher {
        files: HashMap<String, Vec<u8>>,
        requests: Mutex<Vec<String>>,
    }

    impl MapFetcher {
        fn with(entries: &[(&str, &[u8])]) -> Self {
            Self {
                files: entries
                    .iter()
                    .map(|(url, data)| (url.to_string(), data.to_vec()))
                    .collect(),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AssetFetcherPort for MapFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.requests.lock().unwrap().push(url.to_string());
            self.files.get(url).cloned().ok_or(FetchError::BadStatus {
                status: 404,
                url: url.to_string(),
            })
        }
    }

    fn voice_file(name: &str, url: &str, data: &[u8]) -> VoiceFile {
        VoiceFile {
            file_name: name.to_string(),
            file_url: url.to_string(),
            file_hash: content_hash(data),
        }
    }

    async fn dir_names(dir: &Path) -> Vec<String> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(dir).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_sync_downloads_missing_files() {
        let root = tempdir().unwrap();
        let fetcher = Arc::new(MapFetcher::with(&[("http://f/1", b"one"), ("http://f/2", b"two")]));
        let store = FileVoiceAssetStore::new(root.path(), fetcher.clone());
        let files = vec![
            voice_file("a.mp3", "http://f/1", b"one"),
            voice_file("b.mp3", "http://f/2", b"two"),
        ];

        let report = store.sync("user_1", &files).await.unwrap();

        assert_eq!(report.downloaded, vec!["a.mp3", "b.mp3"]);
        let dir = store.voice_dir("user_1");
        assert_eq!(dir_names(&dir).await, vec!["a.mp3", "b.mp3"]);
        assert_eq!(fs::read(dir.join("a.mp3")).await.unwrap(), b"one");
        assert_eq!(fetcher.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_sync_is_idempotent() {
        let root = tempdir().unwrap();
        let fetcher = Arc::new(MapFetcher::with(&[("http://f/1", b"one")]));
        let store = FileVoiceAssetStore::new(root.path(), fetcher.clone());
        let files = vec![voice_file("a.mp3", "http://f/1", b"one")];

        store.sync("user_1", &files).await.unwrap();
        let second = store.sync("user_1", &files).await.unwrap();

        assert!(second.is_noop());
        assert_eq!(second.reused, vec!["a.mp3"]);
        assert_eq!(fetcher.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_sync_accepts_uppercase_declared_hash() {
        let root = tempdir().unwrap();
        let fetcher = Arc::new(MapFetcher::default());
        let store = FileVoiceAssetStore::new(root.path(), fetcher.clone());
        let dir = store.voice_dir("user_1");
        fs::create_dir_all(&dir).await.unwrap();
        fs::write(dir.join("a.mp3"), b"one").await.unwrap();

        let mut file = voice_file("a.mp3", "http://f/1", b"one");
        file.file_hash = file.file_hash.to_uppercase();

        let report = store.sync("user_1", &[file]).await.unwrap();
        assert!(report.is_noop());
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn test_sync_replaces_changed_file_and_prunes_stale() {
        let root = tempdir().unwrap();
        let fetcher = Arc::new(MapFetcher::with(&[("http://f/1", b"new content")]));
        let store = FileVoiceAssetStore::new(root.path(), fetcher.clone());
        let dir = store.voice_dir("user_1");
        fs::create_dir_all(&dir).await.unwrap();
        fs::write(dir.join("a.mp3"), b"old content").await.unwrap();
        fs::write(dir.join("stale.mp3"), b"stale").await.unwrap();

        let files = vec![voice_file("a.mp3", "http://f/1", b"new content")];
        let report = store.sync("user_1", &files).await.unwrap();

        assert_eq!(report.downloaded, vec!["a.mp3"]);
        assert_eq!(report.removed, vec!["stale.mp3"]);
        assert_eq!(dir_names(&dir).await, vec!["a.mp3"]);
        assert_eq!(fs::read(dir.join("a.mp3")).await.unwrap(), b"new content");
    }

    #[tokio::test]
    async fn test_sync_with_empty_list_clears_directory() {
        let root = tempdir().unwrap();
        let store = FileVoiceAssetStore::new(root.path(), Arc::new(MapFetcher::default()));
        let dir = store.voice_dir("user_1");
        fs::create_dir_all(&dir).await.unwrap();
        fs::write(dir.join("old.mp3"), b"x").await.unwrap();

        let report = store.sync("user_1", &[]).await.unwrap();

        assert_eq!(report.removed, vec!["old.mp3"]);
        assert!(dir_names(&dir).await.is_empty());
    }

    #[tokio::test]
    async fn test_download_failure_aborts_but_keeps_written_files() {
        let root = tempdir().unwrap();
        let fetcher = Arc::new(MapFetcher::with(&[("http://f/1", b"one")]));
        let store = FileVoiceAssetStore::new(root.path(), fetcher);
        let dir = store.voice_dir("user_1");
        fs::create_dir_all(&dir).await.unwrap();
        fs::write(dir.join("stale.mp3"), b"stale").await.unwrap();

        let files = vec![
            voice_file("a.mp3", "http://f/1", b"one"),
            voice_file("b.mp3", "http://f/missing", b"two"),
        ];
        let err = store.sync("user_1", &files).await.unwrap_err();

        assert!(matches!(err, AssetSyncError::Download { ref file_name, .. } if file_name == "b.mp3"));
        // 已下载的保留，尚未执行清理
        assert_eq!(dir_names(&dir).await, vec!["a.mp3", "stale.mp3"]);
    }

    #[tokio::test]
    async fn test_hash_mismatch_fails_sync_and_writes_nothing() {
        let root = tempdir().unwrap();
        let fetcher = Arc::new(MapFetcher::with(&[("http://f/1", b"served")]));
        let store = FileVoiceAssetStore::new(root.path(), fetcher.clone());
        let files = vec![voice_file("a.mp3", "http://f/1", b"declared")];

        let err = store.sync("user_1", &files).await.unwrap_err();
        assert!(matches!(
            err,
            AssetSyncError::HashMismatch { ref file_name, ref actual, .. }
                if file_name == "a.mp3" && *actual == content_hash(b"served")
        ));
        assert!(dir_names(&store.voice_dir("user_1")).await.is_empty());

        // 上游修正后，下一次同步正常下载，之后不再重复下载
        let fixed = Arc::new(MapFetcher::with(&[("http://f/1", b"declared")]));
        let store = FileVoiceAssetStore::new(root.path(), fixed.clone());
        assert_eq!(store.sync("user_1", &files).await.unwrap().downloaded, vec!["a.mp3"]);
        assert!(store.sync("user_1", &files).await.unwrap().is_noop());
        assert_eq!(fixed.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_declared_names_never_clash_with_temp_files() {
        let root = tempdir().unwrap();
        let fetcher = Arc::new(MapFetcher::with(&[("http://f/1", b"one"), ("http://f/2", b"two")]));
        let store = FileVoiceAssetStore::new(root.path(), fetcher);
        let files = vec![
            voice_file("a.mp3.part", "http://f/2", b"two"),
            voice_file("a.mp3", "http://f/1", b"one"),
        ];

        store.sync("user_1", &files).await.unwrap();

        let dir = store.voice_dir("user_1");
        assert_eq!(dir_names(&dir).await, vec!["a.mp3", "a.mp3.part"]);
        assert_eq!(fs::read(dir.join("a.mp3.part")).await.unwrap(), b"two");
        assert_eq!(fs::read(dir.join("a.mp3")).await.unwrap(), b"one");
    }

    #[test]
    fn test_content_hash_is_md5_hex() {
        assert_eq!(content_hash(b""), "d41d8cd98f00b204e9800998ecf8427e");
    }
}
