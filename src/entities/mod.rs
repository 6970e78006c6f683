pub mod favorite;
pub mod watch_later;
