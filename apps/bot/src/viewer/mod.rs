// Read-only web surface: a user's archived posts, hydrated from the AppView.

pub mod fetch;
pub mod handlers;
pub mod render;
