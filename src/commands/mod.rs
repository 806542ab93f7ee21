mod block;
mod collection;
mod config_cmd;
mod connect;
mod import_cmd;
mod log_cmd;
mod sync_cmd;

pub use block::BlockCommand;
pub use collection::CollectionCommand;
pub use config_cmd::ConfigCommand;
pub use connect::{ConnectCommand, DisconnectCommand};
pub use import_cmd::ImportCommand;
pub use log_cmd::LogCommand;
pub use sync_cmd::SyncCommand;
