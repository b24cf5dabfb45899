pub mod ddl;
pub mod markers;
pub mod metadata;
pub mod posts;
pub mod sessions;
