pub mod ai;
pub mod character;
pub mod config;
pub mod error;
pub mod memory;
pub mod prompt;
pub mod session;
pub mod state;
pub mod status;

// Re-export main types for convenience
pub use ai::{Backend, OllamaClient};
pub use character::{Character, CharacterDraft, CharacterRoster};
pub use config::BackendConfig;
pub use error::ChatError;
pub use memory::extract_facts;
pub use prompt::build_prompt;
pub use session::{PendingTurn, Session};
pub use state::{ConversationTurn, MemoryFact, Message};
pub use status::BackendStatus;
