//! Core types for waldo
//!
//! This crate provides the data model shared by the dispatch, search and
//! application crates: backend routing, completion wire types, structured
//! image queries, pull progress and session state.

pub mod backend;
pub mod completion;
pub mod config;
pub mod image;
pub mod pull;
pub mod search;

pub use backend::{resolve_alias, Backend};
pub use completion::{
    ChunkTiming, CompletionChunk, CompletionRequest, GenerateResponse, ModelEntry, ModelList,
    ResponseFormat,
};
pub use config::{Config, Session, DEFAULT_MODEL, DEFAULT_OLLAMA_HOST};
pub use image::{ImageData, ImageQuery};
pub use pull::{render_decision, ProgressRender, PullProgress, PullState};
pub use search::{format_hits, SearchHit};
