pub mod markup;
pub mod mention;
