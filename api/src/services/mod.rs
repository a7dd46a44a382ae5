pub mod blog;
pub mod conversations;
pub mod db;
pub mod error;
pub mod instagram;
pub mod openai;
pub mod publisher;
pub mod replies;
pub mod webhook;
pub mod wordpress;
