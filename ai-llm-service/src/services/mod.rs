pub mod embedding_service;
pub mod open_ai_service;
