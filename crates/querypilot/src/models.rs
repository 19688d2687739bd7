//! These models represent the objects passed between the orchestrator, the reasoning
//! engine and the tool gateway.
//!
//! Messages and content blocks serialize directly into the reasoning engine's wire
//! shape, so a conversation can be replayed without a conversion step. Tools come
//! from the gateway in its own shape and are translated into declarations before
//! they are sent to the engine.
pub mod message;
pub mod tool;
