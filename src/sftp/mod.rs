//! SFTP layer
//!
//! Session pooling, directory listing and the transport seam the pool talks
//! through.

pub mod error;
pub mod lister;
pub mod path_utils;
pub mod pool;
pub mod testing;
pub mod transport;

pub use error::{FetchError, ListError, SyncError};
pub use lister::{list, Entry};
pub use path_utils::{join_remote_path, local_temp_path, scratch_dir};
pub use pool::SessionPool;
pub use transport::{Connector, RawEntry, RemoteFs};
