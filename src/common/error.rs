use thiserror::Error;

use super::types::PageId;

/// Storage-engine error types.
#[derive(Error, Debug)]
pub enum StrataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} not found in buffer pool")]
    PageNotFound(PageId),

    #[error("buffer pool is full and no frame is evictable")]
    NoFreeFrame,

    #[error("{0} is still pinned")]
    PageStillPinned(PageId),

    #[error("invalid page id: {0}")]
    InvalidPageId(PageId),

    #[error("header page has no room for another index record")]
    HeaderPageFull,

    #[error("index {0:?} is not registered in the header page")]
    IndexNameNotFound(String),

    #[error("corrupt page: {0}")]
    CorruptPage(&'static str),

    #[error("disk scheduler error: {0}")]
    DiskScheduler(String),

    #[error("channel error: {0}")]
    Channel(String),
}

pub type Result<T> = std::result::Result<T, StrataError>;
