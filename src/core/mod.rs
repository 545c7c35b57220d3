pub mod app;
pub mod chat;
pub mod chat_stream;
pub mod config;
pub mod dictation;
pub mod gemini;
pub mod llm;
pub mod markup;
pub mod message;
pub mod persona;
pub mod storage;
