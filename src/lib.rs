#![forbid(unsafe_code)]

pub mod build;
pub mod cli;
pub mod config;
pub mod fetch;
pub mod formats;
pub mod locale;
pub mod logging;
pub mod mapping;
pub mod markdown;
pub mod page;
pub mod palette;
pub mod paths;
pub mod slug;
pub mod store;
