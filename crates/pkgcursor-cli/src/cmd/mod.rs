pub mod hdlist;
pub mod pack;
pub mod query;
