//! Reading and writing cache files.

mod load;
mod save;

pub use load::read_cache_file;
pub use save::write_cache_file;
