pub mod room_repository;
pub mod vote_repository;
