//! The output of the scope-resolution pass.

use indexmap::IndexMap;
use smol_str::SmolStr;
use tangle_syntax::span::Span;

/// One global binding. Keyed by name in [`ScopeState::definitions`]; when a
/// name is bound globally more than once in a unit, the lexically last
/// occurrence wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Definition {
    pub span: Span,
}

/// One local binding: within `validity`, a reference to `name` resolves to
/// this binding instead of a global of the same name. Locals are not
/// deduplicated; every binding site gets its own entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Local {
    pub name: SmolStr,
    /// Where the name is bound.
    pub definition: Span,
    /// The region in which references resolve to this binding.
    pub validity: Span,
}

/// One identifier reference. `definition` is the binding site of the local
/// that captures it, or `None` for a reference to a global.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Usage {
    pub name: SmolStr,
    pub span: Span,
    pub definition: Option<Span>,
}

/// Everything the pass finds out about one unit of source code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeState {
    /// Every identifier reference, global or local, in discovery order.
    pub usages: Vec<Usage>,
    /// All global definitions, keyed by name, in insertion order.
    pub definitions: IndexMap<SmolStr, Definition>,
    /// All local bindings in discovery order.
    pub locals: Vec<Local>,
}

impl ScopeState {
    /// The local binding a reference at `span` resolves to: the first entry,
    /// in discovery order, whose name matches and whose validity contains
    /// the span. Not necessarily the innermost match; callers rely on this
    /// exact rule.
    pub fn find_local_definition(&self, name: &str, span: Span) -> Option<&Local> {
        self.locals
            .iter()
            .find(|local| local.name == name && local.validity.contains(span))
    }
}
