pub mod lobby_stream;
pub mod room_stream;

pub use lobby_stream::lobby_events;
pub use room_stream::room_events;
