use std::path::PathBuf;

use crate::delivery::DeliveryError;
use crate::timelapse::TimelapseArtifact;

/// 本地归档目录
pub struct Archive {
    dir: PathBuf,
}

impl Archive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 写入 `<dir>/<filename>`, 返回文件路径
    pub async fn store(&self, artifact: &TimelapseArtifact) -> Result<PathBuf, DeliveryError> {
        let path = self.dir.join(&artifact.filename);
        let archive_err = |source| DeliveryError::Archive {
            path: path.clone(),
            source,
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(archive_err)?;
        tokio::fs::write(&path, &artifact.data)
            .await
            .map_err(archive_err)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::tests::artifact;

    #[tokio::test]
    async fn test_store_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("gifs");
        let archive = Archive::new(&dir);

        let artifact = artifact();
        let path = archive.store(&artifact).await.unwrap();

        assert_eq!(path, dir.join(&artifact.filename));
        assert_eq!(std::fs::read(&path).unwrap(), artifact.data);
    }

    #[tokio::test]
    async fn test_store_into_file_fails() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let archive = Archive::new(tmp.path());

        let err = archive.store(&artifact()).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Archive { .. }));
    }
}
