pub mod remote_http;
pub mod snapshot_file;

pub use remote_http::HttpRemoteHouses;
pub use snapshot_file::FileSnapshotStore;
