use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;

/// 原始图片字节的落盘接口
///
/// 在元数据提交之后、摄取锁之外调用
pub trait BlobStore: Send + Sync {
    fn write(&self, filename: &str, data: &[u8]) -> Result<()>;
}

/// 把图片写入单个目录的文件存储
pub struct FsBlobStore {
    base: PathBuf,
}

impl FsBlobStore {
    /// 创建存储目录（如不存在）
    pub fn new<P: AsRef<Path>>(base: P) -> Result<Self> {
        fs::create_dir_all(&base)
            .with_context(|| format!("failed to create blob dir {}", base.as_ref().display()))?;
        Ok(Self { base: base.as_ref().to_path_buf() })
    }

    /// 文件名对应的完整路径
    pub fn path_of(&self, filename: &str) -> PathBuf {
        self.base.join(filename)
    }
}

impl BlobStore for FsBlobStore {
    fn write(&self, filename: &str, data: &[u8]) -> Result<()> {
        let path = self.path_of(filename);
        fs::write(&path, data).with_context(|| format!("failed to write {}", path.display()))?;
        debug!("blob written: {}", path.display());
        Ok(())
    }
}
