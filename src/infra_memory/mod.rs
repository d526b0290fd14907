//! Process-local adapters. Used by the `memory` backends and by tests.

mod advert_repo_memory;
mod cache_log_memory;
mod principal_repo_memory;

pub use advert_repo_memory::*;
pub use cache_log_memory::*;
pub use principal_repo_memory::*;
