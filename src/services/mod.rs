pub mod chunk_service;
pub mod completion_service;
pub mod generation_service;
pub mod parser_service;
pub mod question_store;
pub mod quiz_service;
pub mod relevance_service;
pub mod validation_service;
