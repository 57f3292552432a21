pub mod daemon;
pub mod health;
pub mod init;
pub mod node;
pub mod version;

pub use daemon::Daemon;
pub use health::Health;
pub use init::Init;
pub use node::Node;
pub use version::Version;
