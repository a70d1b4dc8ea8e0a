//! # gtcheck kernel
//!
//! Vocabulary shared by the registries, the rule evaluator and the CLI:
//!
//! ```text
//! Service          ← closed set of mock backends (+ Unknown)
//!     │
//! ParsedCall       ← method name + positional ArgShapes of one call string
//!     │
//! ValidationIssue  ← severity + file + locator + message
//! ```
//!
//! Nothing here touches the filesystem.

pub mod call;
pub mod error;
pub mod issue;
pub mod service;

pub use call::{ArgShape, ParsedCall, parse_call, try_parse_call};
pub use error::CallSyntaxError;
pub use issue::{IssueSink, Locator, Severity, ValidationIssue};
pub use service::Service;
