// Notification-processing pipeline.
// Flow: scheduler → walker → resolver → responder → archive store.

pub mod error;
pub mod resolver;
pub mod responder;
pub mod scheduler;
pub mod walker;

pub use responder::Responder;
pub use scheduler::PollScheduler;
pub use walker::NotificationWalker;
