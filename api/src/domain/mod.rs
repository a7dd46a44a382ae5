pub mod activity;
pub mod blog_history;
pub mod images;
pub mod posts;
pub mod stats;
