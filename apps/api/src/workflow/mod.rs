pub mod engine;
pub mod handlers;
pub mod nodes;
pub mod prompts;
pub mod router;
pub mod state;
