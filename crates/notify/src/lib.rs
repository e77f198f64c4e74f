pub mod context;
pub mod eligibility;
pub mod post_notify;
pub mod render;
#[cfg(test)]
pub(crate) mod testing;
pub mod worker;
