//! Static scope resolution for one unit of source code.
//!
//! Given a parsed [`SyntaxTree`](tangle_syntax::tree::SyntaxTree) and its
//! source text, classify every identifier occurrence as a global definition,
//! a local definition, or a usage, and link each usage to the local binding
//! that captures it. The reactive layer downstream compares the global
//! definition and usage sets between units to decide what must re-run, so
//! global/local classification must be exact.
//!
//! The pass is a pure function of (tree, source): it holds no state across
//! runs and does no I/O. On an internal defect it returns an error rather
//! than a partially filled [`ScopeState`]; the caller is expected to
//! substitute an empty state and report the failure through its own channel.

use thiserror::Error;

pub mod resolve;
pub mod state;


pub use resolve::{resolve_scopes, ResolveScopes};
pub use state::{Definition, Local, ScopeState, Usage};

/// A defect inside the pass itself.
#[derive(Error, Debug)]
pub enum ScopeError {
    #[error("scope stack not empty after traversal: {depth} scope(s) left open")]
    UnbalancedScopes { depth: usize },
}
