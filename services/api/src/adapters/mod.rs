pub mod db;
pub mod placement_llm;

pub use db::DbAdapter;
pub use placement_llm::OpenAiPlacementAdapter;
