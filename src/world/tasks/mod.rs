//! # World Task System
//!
//! Tasks run on the worker pool while a world is being generated.

pub mod cell_generation_task;
