// Roadmap progress: templates, per-user progress state, AI personalization.
// All generation calls go through llm_client via the TextGenerator trait.

pub mod controller;
pub mod error;
pub mod handlers;
pub mod personalize;
pub mod progress;
pub mod prompts;
pub mod session;
pub mod store;
pub mod templates;

pub use controller::RoadmapProgressController;
pub use error::RoadmapError;
pub use session::SessionRegistry;
pub use store::{InMemoryRoadmapStore, PgRoadmapStore, RoadmapStore};
