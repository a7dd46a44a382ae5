//! Application constants

/// Maximum messages kept per DM conversation
pub const MAX_CONVERSATION_HISTORY: usize = 20;

/// Maximum upload size for images (10 MB)
pub const MAX_IMAGE_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Default delay between media container status polls
pub const DEFAULT_CONTAINER_POLL_INTERVAL_MS: u64 = 2000;

/// Default number of status polls before giving up on a container
pub const DEFAULT_CONTAINER_POLL_ATTEMPTS: u32 = 10;

/// Number of activity log rows returned by the dashboard listing
pub const RECENT_ACTIVITY_LIMIT: i64 = 50;

/// Number of blog history rows fed into the article prompt
pub const BLOG_HISTORY_WINDOW: i64 = 5;

/// Sent when a DM reply cannot be generated
pub const DM_FALLBACK_REPLY: &str =
    "Sorry, I'm having trouble right now. A human agent will get back to you shortly!";

/// Posted when a comment reply cannot be generated
pub const COMMENT_FALLBACK_REPLY: &str =
    "Thanks for the comment. DM us if you have any questions.";

/// Image extensions accepted by the upload endpoint
pub const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "webp", "gif"];
