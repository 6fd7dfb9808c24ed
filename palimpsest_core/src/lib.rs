//! # Palimpsest Core
//!
//! The engine behind the mutable narrative. It records how the reader moves
//! through the constellation, evaluates transformation conditions against that
//! journey, and rewrites node text deterministically so the same journey always
//! renders the same words.
//!
//! ## Core Components
//!
//! - **journey**: append-only ledger of visits, transitions and tag engagement
//! - **conditions**: pure evaluation of the condition language, with memoization
//! - **rules**: promotion of authored and journey-derived rules into the node store
//! - **variants**: priority-ordered choice among content variants
//! - **transform**: ordered, deduplicated, capped application of text edits
//! - **orchestrator**: gathers edits from every source and caches rendered content
//! - **session**: the single owner of mutable reading state
//!
//! ## Design Philosophy
//!
//! - **Raw in, display out**: only `RawContent` is ever transformed; rendered
//!   `DisplayContent` cannot be fed back in
//! - **Monotonic history**: the ledger and rule lists only grow within a session
//! - **Pure core**: evaluation and application depend only on their arguments

pub mod clock;
pub mod conditions;
pub mod config;
pub mod error;
pub mod journey;
pub mod orchestrator;
pub mod rules;
pub mod session;
pub mod transform;
pub mod variants;

pub use clock::*;
pub use conditions::*;
pub use config::*;
pub use error::*;
pub use journey::*;
pub use orchestrator::*;
pub use rules::*;
pub use session::*;
pub use transform::*;
pub use variants::*;
