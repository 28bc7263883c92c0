#![deny(clippy::unwrap_used)]

pub mod attribute_feed;
pub mod config;
pub mod csv;
pub mod encoding;
pub mod error;
pub mod importer;
pub mod reconcile;
pub mod row;
pub mod service;
pub mod store;

pub use config::ImportConfig;
pub use error::RowError;
pub use importer::{import_batch, BatchResult, BatchSummary};
pub use row::ImportRow;
pub use store::Catalog;

pub fn format_duration(duration: &std::time::Duration) -> String {
    let mut res = vec![];
    let hours = duration.as_secs() / 60 / 60;
    let minutes = duration.as_secs() / 60 % 60;
    let seconds = duration.as_secs() % 60;
    let whole_millis = duration.as_millis();
    if hours > 0 {
        res.push(format!("{hours}h"));
    }
    if minutes > 0 {
        res.push(format!("{minutes}m"));
    }
    if seconds > 0 {
        res.push(format!("{seconds}s"));
    }
    if whole_millis < 1000 {
        res.push(format!("{whole_millis}ms"));
    }
    itertools::intersperse(res, " ".to_string()).collect()
}
