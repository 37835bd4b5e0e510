pub mod chunk;
pub mod question;
pub mod relevance;
