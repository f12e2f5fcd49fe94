pub mod suggestion;
pub mod vote;
