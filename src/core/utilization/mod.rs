pub mod constant;
pub mod dynamic;
pub mod full;
pub mod interface;
