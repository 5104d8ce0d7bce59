pub mod charts;
pub mod datastore;
pub mod errors;
pub mod fallback;
pub mod model;
pub mod report;
pub mod stats;
pub mod store;
pub mod substitute;
