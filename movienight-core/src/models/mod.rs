pub mod ban;
pub mod session;
pub mod settings;

pub use ban::BanRecord;
pub use session::{ConnectionId, SessionInfo, Tier};
pub use settings::{AccessMode, Settings};
