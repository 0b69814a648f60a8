pub mod blob;
pub mod chi2;
pub mod decode;
pub mod histogram;
pub mod imgdb;
pub mod signature;
pub mod store;

pub use imgdb::{ImgDb, ImgDbBuilder, IngestError};
