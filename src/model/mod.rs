pub mod absence;
pub mod analytics;
pub mod auto_reply;
pub mod role;
pub mod settings;
pub mod user;
