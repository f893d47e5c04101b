//! Wellness Planner — guided intake that turns a parent's answers into a
//! personalized weekly plan for an autistic child.

pub mod app;
pub mod channels;
pub mod config;
pub mod error;
pub mod intake;
pub mod llm;
pub mod render;
