use std::fs;
use std::path::Path;

use anyhow::Result;
use byteorder::LittleEndian;
use heed::types::{Bytes, SerdeBincode, Str, U64};
use heed::{Database, Env, EnvOpenOptions, RoTxn, WithTls};

use super::{BucketId, ImageRecord, RecordStore};

/// 分桶 ID 计数器在 meta 库中的键
const NEXT_BUCKET: &str = "next_bucket";

/// 基于 lmdb 的持久化记录存储
///
/// 五个子库：签名 -> 分桶 ID、分桶 ID -> 成员名列表、展示名 -> 记录、
/// 来源链接 -> 展示名、元数据。成员列表由于 lmdb 不保证对齐，
/// 直接用 bincode 序列化整个列表
pub struct LmdbStore {
    env: Env<WithTls>,
    db_buckets: Database<Str, U64<LittleEndian>>,
    db_members: Database<U64<LittleEndian>, Bytes>,
    db_records: Database<Str, SerdeBincode<ImageRecord>>,
    db_sources: Database<Str, Str>,
    db_meta: Database<Str, U64<LittleEndian>>,
}

impl LmdbStore {
    /// 打开或创建记录存储
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        fs::create_dir_all(&path)?;
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(1 << 34) // 16GiB，后续可以考虑动态增长
                .max_dbs(5)
                .open(path)?
        };
        let mut txn = env.write_txn()?;
        let db_buckets =
            env.create_database::<Str, U64<LittleEndian>>(&mut txn, Some("buckets"))?;
        let db_members =
            env.create_database::<U64<LittleEndian>, Bytes>(&mut txn, Some("members"))?;
        let db_records =
            env.create_database::<Str, SerdeBincode<ImageRecord>>(&mut txn, Some("records"))?;
        let db_sources = env.create_database::<Str, Str>(&mut txn, Some("sources"))?;
        let db_meta = env.create_database::<Str, U64<LittleEndian>>(&mut txn, Some("meta"))?;
        txn.commit()?;
        Ok(Self { env, db_buckets, db_members, db_records, db_sources, db_meta })
    }

    fn member_names(&self, txn: &RoTxn<'_, WithTls>, bucket: BucketId) -> Result<Vec<String>> {
        match self.db_members.get(txn, &bucket)? {
            Some(data) => Ok(bincode::deserialize(data)?),
            None => Ok(Vec::new()),
        }
    }
}

impl RecordStore for LmdbStore {
    fn find_bucket(&self, signature: &str) -> Result<Option<BucketId>> {
        let txn = self.env.read_txn()?;
        Ok(self.db_buckets.get(&txn, signature)?)
    }

    fn create_bucket(&mut self, signature: &str) -> Result<BucketId> {
        let mut txn = self.env.write_txn()?;
        let id = self.db_meta.get(&txn, NEXT_BUCKET)?.unwrap_or(0);
        self.db_meta.put(&mut txn, NEXT_BUCKET, &(id + 1))?;
        self.db_buckets.put(&mut txn, signature, &id)?;
        self.db_members.put(&mut txn, &id, &bincode::serialize(&Vec::<String>::new())?)?;
        txn.commit()?;
        Ok(id)
    }

    fn list_records(&self, bucket: BucketId) -> Result<Vec<ImageRecord>> {
        let txn = self.env.read_txn()?;
        let mut records = Vec::new();
        for name in self.member_names(&txn, bucket)? {
            match self.db_records.get(&txn, &name)? {
                Some(record) => records.push(record),
                // 成员列表和记录库必须一致，不一致说明写入逻辑有 bug
                None => panic!("bucket {bucket} references missing record {name}"),
            }
        }
        Ok(records)
    }

    fn name_exists(&self, name: &str) -> Result<bool> {
        let txn = self.env.read_txn()?;
        Ok(self.db_records.get(&txn, name)?.is_some())
    }

    fn append_record(&mut self, record: ImageRecord) -> Result<()> {
        let mut txn = self.env.write_txn()?;
        let mut names = match self.db_members.get(&txn, &record.bucket)? {
            Some(data) => bincode::deserialize::<Vec<String>>(data)?,
            None => Vec::new(),
        };
        names.push(record.name.clone());
        self.db_members.put(&mut txn, &record.bucket, &bincode::serialize(&names)?)?;
        self.db_records.put(&mut txn, &record.name, &record)?;
        txn.commit()?;
        Ok(())
    }

    fn add_source(&mut self, name: &str, link: &str) -> Result<()> {
        let mut txn = self.env.write_txn()?;
        self.db_sources.put(&mut txn, link, name)?;
        txn.commit()?;
        Ok(())
    }

    fn source_exists(&self, link: &str) -> Result<bool> {
        let txn = self.env.read_txn()?;
        Ok(self.db_sources.get(&txn, link)?.is_some())
    }
}
