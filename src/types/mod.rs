mod file_type;
mod models;
mod role;

pub use file_type::FileType;
pub use models::*;
pub use role::Role;
