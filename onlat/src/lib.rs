//! onlat: command-line driver for the online decoder.

pub mod cli;
pub mod decode;
pub mod info;
