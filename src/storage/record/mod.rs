pub mod file_handle;
pub mod page_handle;
pub mod rm_defs;

pub use file_handle::RmFileHandle;
pub use page_handle::RmPageHandle;
pub use rm_defs::{Record, Rid, RmFileHdr, RmPageHdr};
