pub mod decoder;
pub mod history;
pub mod subscription;

pub use decoder::{decode_sample, decode_value, key_timestamp, RawDeviceSample};
pub use history::{fetch_field, fetch_history};
pub use subscription::{subscribe_latest, watch_latest, LatestSubscription, LiveFeed};
