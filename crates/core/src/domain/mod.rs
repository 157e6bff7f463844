pub mod conversation;
pub mod customer;
pub mod offer;
pub mod task;
