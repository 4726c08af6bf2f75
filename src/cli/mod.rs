pub mod analyse;
pub mod command;
pub mod info;
