pub mod input;
pub mod notification;
