mod branch;
mod session;
mod unread;

pub use branch::BranchName;
pub use session::SessionToken;
pub use unread::UnreadCount;
