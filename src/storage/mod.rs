//! Directory storage for index files.
//!
//! An index lives in exactly one [`Storage`]: a [`FileStorage`] directory when
//! the host database is disk-backed, a [`MemoryStorage`] otherwise.

pub mod checksum;
pub mod file;
pub mod memory;
pub mod traits;

pub use checksum::{read_checksummed, write_checksummed};
pub use file::*;
pub use memory::*;
pub use traits::*;
