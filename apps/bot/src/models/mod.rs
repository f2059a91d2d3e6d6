pub mod saved_post;
