pub mod openai_api;
pub mod player_ids;

pub use openai_api::OpenAiPlayerIdResolver;
pub use player_ids::{CachingPlayerIdResolver, PlayerIdResolver, StaticPlayerIdResolver};
