mod buffer_pool_manager;
mod frame;
mod lru_k_replacer;

pub use buffer_pool_manager::*;
pub use frame::*;
pub use lru_k_replacer::*;
