//! These models represent the objects passed around by the engine
//!
//! There are a few related formats we need to interact with:
//! - openai compatible chat messages/tools, sent from the engine to the LLM
//! - tool calls and their results, exchanged between the engine and the catalog
//! - the append-only conversation owned by a single engine run
//!
//! We always immediately convert provider formats into the internal structs using
//! to/from helpers, so the internal models are not an exact match to any of them.
pub mod conversation;
pub mod message;
pub mod role;
pub mod tool;
