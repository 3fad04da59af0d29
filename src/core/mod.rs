pub mod activity;
pub mod budget;
pub mod daily_task;
pub mod date;
pub mod document;
pub mod locale;
pub mod principal;
pub mod profile;
pub mod project;
pub mod reorder;
pub mod streak;
pub mod task;

use uuid::Uuid;

/// Fresh entity id. Ids are opaque strings; ones loaded from older documents
/// need not be UUIDs.
pub fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}
