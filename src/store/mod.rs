use anyhow::Result;
use serde::{Deserialize, Serialize};

mod lmdb;
mod memory;

pub use lmdb::LmdbStore;
pub use memory::MemoryStore;

/// 分桶 ID，由记录存储分配
pub type BucketId = u64;

/// 一条已入库的图片记录
///
/// 持久化之后不可变；name 最多在持久化之前为了解决重名被调整一次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// 展示名，全库唯一
    pub name: String,
    /// 格式标签，例如 "png"、"jpeg"
    pub format: String,
    /// 特征向量的小端 f32 序列化字节
    pub feature: Vec<u8>,
    /// 所属分桶
    pub bucket: BucketId,
}

impl ImageRecord {
    /// 落盘文件名
    pub fn filename(&self) -> String {
        format!("{}.{}", self.name, self.format)
    }
}

/// 记录存储接口
///
/// 所有方法都假定调用方持有摄取锁，实现本身不需要额外的线程安全保证。
/// 分桶和记录只增不删。
pub trait RecordStore: Send {
    /// 按签名查找分桶
    fn find_bucket(&self, signature: &str) -> Result<Option<BucketId>>;
    /// 创建签名对应的分桶，调用方保证签名尚不存在
    fn create_bucket(&mut self, signature: &str) -> Result<BucketId>;
    /// 列出分桶内的全部记录（物化快照，顺序无关紧要）
    fn list_records(&self, bucket: BucketId) -> Result<Vec<ImageRecord>>;
    /// 检查展示名是否已被任何记录占用
    fn name_exists(&self, name: &str) -> Result<bool>;
    /// 把记录追加到其分桶
    fn append_record(&mut self, record: ImageRecord) -> Result<()>;
    /// 关联一条来源链接到已有记录
    fn add_source(&mut self, name: &str, link: &str) -> Result<()>;
    /// 检查来源链接是否已经入库
    fn source_exists(&self, link: &str) -> Result<bool>;
}
