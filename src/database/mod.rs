pub mod connection;
pub mod operations;

pub use connection::{create_ssl_connector, RetryPolicy};
pub use operations::{create_alert_table, store_alert};
