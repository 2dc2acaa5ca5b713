pub mod group;

pub mod reader;
