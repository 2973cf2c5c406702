//! Abstract syntax tree types for markup-lit.
//!
//! The AST has two layers:
//!
//! - **Markup layer** ([`markup`]): elements, fragments, attributes and
//!   children, exactly as written in the assembled template source.
//! - **Expression layer** ([`expr`]): the small expression language that
//!   appears inside `{ ... }` containers. Expressions may nest markup.
//!
//! [`value`] holds the runtime [`Value`] type shared by both layers and
//! by the rendering back ends.

pub mod expr;
pub mod markup;
pub mod span;
pub mod value;

// Convenience re-exports
pub use expr::*;
pub use markup::*;
pub use span::{Span, Spanned};
pub use value::{Deferred, Iterable, Props, Slot, ToValue, Value};
