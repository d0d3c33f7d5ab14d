//! # Core Module
//!
//! Small concurrency primitives shared by the pipeline.
//!
//! ## Key Components
//! - `MtResource`: thread-safe reference-counted resource with read-write locking
//! - `CancellationToken`: one-way stop flag shared between the builder and its workers
//!
//! ## Usage
//! ```rust
//! use topoblock::core::{CancellationToken, MtResource};
//!
//! let counter = MtResource::new(0);
//! *counter.get_mut() += 1;
//! assert_eq!(*counter.get(), 1);
//!
//! let token = CancellationToken::new();
//! token.clone().cancel();
//! assert!(token.is_cancelled());
//! ```

pub mod cancellation;
pub mod mt_resource;

pub use cancellation::CancellationToken;
pub use mt_resource::MtResource;
