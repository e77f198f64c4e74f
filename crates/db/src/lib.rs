pub mod enums;
pub mod impls;
pub mod newtypes;
pub mod sensitive;
pub mod source;
pub mod traits;
