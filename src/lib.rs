#![forbid(unsafe_code)]

pub mod assemble;
pub mod build;
pub mod chrome;
pub mod cli;
pub mod driver;
pub mod error;
pub mod export;
pub mod fetch;
pub mod formats;
pub mod index;
pub mod logging;
pub mod profile;
pub mod sanitize;
