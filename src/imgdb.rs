use std::fmt::Write as _;
use std::sync::Mutex;

use log::{debug, info};
use rand::RngCore;
use thiserror::Error;

use crate::blob::BlobStore;
use crate::chi2::chi2_distance;
use crate::decode::{DefaultDecoder, ImageDecoder};
use crate::histogram::{Feature, RgbHistogram, generate_feature};
use crate::signature::bit_signature;
use crate::store::{ImageRecord, RecordStore};

/// 判定重复的卡方距离阈值，经验值
const CHI_THRESHOLD: f64 = 5e-3;
/// 默认的最小宽高限制
const MIN_DIMENSION: u32 = 500;

/// 摄取一张图片可能出现的错误
#[derive(Debug, Error)]
pub enum IngestError {
    /// 字节流无法解码为图片
    #[error("failed to decode image")]
    Decode(#[source] anyhow::Error),
    /// 图片尺寸低于下限
    #[error("image too small: got {width}x{height}, minimum {min_width}x{min_height}")]
    TooSmall { width: u32, height: u32, min_width: u32, min_height: u32 },
    /// 能解码但不在支持的格式范围内
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),
    /// 与已入库的图片过于相似，existing 为已有文件名，rejected 为被拒绝的文件名
    #[error("duplicate image: existing {existing}, rejected {rejected}")]
    Duplicate { existing: String, rejected: String },
    /// 记录存储操作失败
    #[error("record store operation failed")]
    Store(#[source] anyhow::Error),
    /// 元数据已提交，但图片字节落盘失败
    #[error("failed to write blob {filename}")]
    Blob { filename: String, source: anyhow::Error },
}

/// 图片去重入库的协调器
///
/// 持有唯一的共享可变状态（记录存储）和它的互斥锁。
/// 分桶查找/创建、查重扫描、重名处理和记录插入在同一个临界区内完成，
/// 保证并发摄取互为重复的图片时最多只有一个成功
pub struct ImgDb<S, B> {
    store: Mutex<S>,
    blobs: B,
    decoder: Box<dyn ImageDecoder>,
    histogram: RgbHistogram,
    min_width: u32,
    min_height: u32,
    threshold: f64,
}

/// [`ImgDb`] 的配置构造器
pub struct ImgDbBuilder {
    bins: (u32, u32, u32),
    min_width: u32,
    min_height: u32,
    threshold: f64,
    decoder: Box<dyn ImageDecoder>,
}

impl ImgDbBuilder {
    pub fn new() -> Self {
        Self {
            bins: (8, 8, 8),
            min_width: MIN_DIMENSION,
            min_height: MIN_DIMENSION,
            threshold: CHI_THRESHOLD,
            decoder: Box::new(DefaultDecoder),
        }
    }

    /// 每个颜色通道的分箱数量
    pub fn bins(mut self, r: u32, g: u32, b: u32) -> Self {
        self.bins = (r, g, b);
        self
    }

    /// 低于该宽高的图片直接拒绝
    pub fn min_size(mut self, width: u32, height: u32) -> Self {
        self.min_width = width;
        self.min_height = height;
        self
    }

    /// 判定重复的距离阈值
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// 替换默认的图片解码器
    pub fn decoder(mut self, decoder: impl ImageDecoder + 'static) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    pub fn open<S, B>(self, store: S, blobs: B) -> ImgDb<S, B>
    where
        S: RecordStore,
        B: BlobStore,
    {
        let (r, g, b) = self.bins;
        ImgDb {
            store: Mutex::new(store),
            blobs,
            decoder: self.decoder,
            histogram: RgbHistogram::new(r, g, b),
            min_width: self.min_width,
            min_height: self.min_height,
            threshold: self.threshold,
        }
    }
}

impl Default for ImgDbBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: RecordStore, B: BlobStore> ImgDb<S, B> {
    /// 摄取一张图片：查重通过则建立记录并落盘，否则报告拒绝原因
    ///
    /// 返回的记录中 name 可能带有为解决重名追加的随机后缀
    pub fn ingest(&self, name: &str, data: &[u8]) -> Result<ImageRecord, IngestError> {
        let img = self.decoder.decode(data).map_err(IngestError::Decode)?;

        if img.width() < self.min_width || img.height() < self.min_height {
            return Err(IngestError::TooSmall {
                width: img.width(),
                height: img.height(),
                min_width: self.min_width,
                min_height: self.min_height,
            });
        }

        let feature = generate_feature(&self.histogram, &img)
            .ok_or_else(|| IngestError::UnsupportedFormat(img.format().to_string()))?;
        let signature = bit_signature(feature.values());
        let mut filename = format!("{}.{}", name, img.format());
        debug!("ingest {filename}: signature {signature}");

        // 临界区：分桶解析、查重扫描、重名处理和插入必须作为一个原子单元，
        // 拆成多次加锁会重新引入先检查后写入的竞争
        let record = {
            let mut store = self.store.lock().expect("record store mutex poisoned");

            let bucket = match store.find_bucket(&signature).map_err(IngestError::Store)? {
                Some(id) => id,
                None => {
                    info!("new bucket {signature}");
                    store.create_bucket(&signature).map_err(IngestError::Store)?
                }
            };

            for existing in store.list_records(bucket).map_err(IngestError::Store)? {
                let stored = Feature::from_bytes(&existing.feature);
                let dist = chi2_distance(feature.values(), stored.values());
                if dist < self.threshold {
                    debug!("duplicate of {} (chi2 {dist:.6}), rejecting {filename}", existing.filename());
                    return Err(IngestError::Duplicate {
                        existing: existing.filename(),
                        rejected: filename,
                    });
                }
            }

            let mut final_name = name.to_string();
            if store.name_exists(&final_name).map_err(IngestError::Store)? {
                final_name.push_str(&random_suffix());
                filename = format!("{}.{}", final_name, img.format());
                debug!("name collision, randomized to {filename}");
            }

            let record = ImageRecord {
                name: final_name,
                format: img.format().to_string(),
                feature: feature.to_bytes(),
                bucket,
            };
            store.append_record(record.clone()).map_err(IngestError::Store)?;
            record
        };

        // 元数据已提交，文件写入在锁外进行；此处失败会留下无文件的记录
        self.blobs
            .write(&filename, data)
            .map_err(|source| IngestError::Blob { filename, source })?;

        info!("ingested {}", record.filename());
        Ok(record)
    }

    /// 关联一条来源链接到已入库的记录
    pub fn add_source(&self, name: &str, link: &str) -> Result<(), IngestError> {
        let mut store = self.store.lock().expect("record store mutex poisoned");
        store.add_source(name, link).map_err(IngestError::Store)
    }

    /// 来源链接是否已经入库，供爬虫提前跳过
    pub fn source_exists(&self, link: &str) -> Result<bool, IngestError> {
        let store = self.store.lock().expect("record store mutex poisoned");
        store.source_exists(link).map_err(IngestError::Store)
    }
}

/// 8 字节加密随机数的十六进制编码，碰撞概率约 10^-19
fn random_suffix() -> String {
    let mut raw = [0u8; 8];
    rand::rng().fill_bytes(&mut raw);
    let mut out = String::with_capacity(16);
    for b in raw {
        write!(out, "{b:02x}").expect("write to string cannot fail");
    }
    out
}
