mod advert_repo_mysql;
mod principal_repo_mysql;
mod util;

pub use advert_repo_mysql::*;
pub use principal_repo_mysql::*;
pub use util::connect_pool;
