pub mod categories;
pub mod classifier;
pub mod config;
pub mod error;
pub mod extractor;
pub mod fetch;
pub mod output;
pub mod scorer;
pub mod service;

pub mod r2r {
    include!(concat!(env!("OUT_DIR"), "/r2r.rs"));
}
