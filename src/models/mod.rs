mod block;
mod collection;
mod connection;

pub use block::{Block, BlockKind, GeoPoint, NewBlock, RemoteSource, REMOTE_PROVIDER_ARENA};
pub use collection::{Collection, NewCollection};
pub use connection::Connection;
