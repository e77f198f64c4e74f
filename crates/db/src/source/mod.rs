pub mod alert;
pub mod board;
pub mod member;
pub mod post;
pub mod task;
pub mod watch;
