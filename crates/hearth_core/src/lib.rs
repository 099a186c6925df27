pub mod action;
pub mod domain;
pub mod ids;
pub mod invite;
pub mod lenient;
pub mod membership;
pub mod normalize;
pub mod ports;
pub mod reconcile;
pub mod reducer;
pub mod schedule;
pub mod seed;

pub use action::Action;
pub use domain::{Db, House, Snapshot, Status, Store, User, View};
pub use ids::Env;
pub use normalize::normalize_snapshot;
pub use ports::{PortError, PortResult, RemoteHouseSource, SnapshotStore};
pub use reconcile::{houses_from_payload, RemoteHouse};
pub use reducer::{reduce, Rejection};
