// Two-phase candidate screening: similarity funnel, then detailed model assessment.

pub mod analyzer;
pub mod assembler;
pub mod assessor;
pub mod embedding;
pub mod handlers;
pub mod models;
pub mod observer;
pub mod pipeline;
pub mod prompts;
pub mod similarity;
pub mod store;
