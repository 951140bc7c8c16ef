//! Scope resolution.
//!
//! A single depth-first walk over the syntax tree. Most node kinds fall
//! through to a generic descent into their children; the constructs with
//! irregular binding rules (assignments, function signatures, imports,
//! scope-override statements, generators, declarative definitions, the bind
//! macro) each have a sub-explorer that consumes the children it understands
//! and hands everything else back to the generic walk.

use smol_str::SmolStr;
use tangle_syntax::kind::NodeKind;
use tangle_syntax::span::Span;
use tangle_syntax::tree::{NodeId, SyntaxTree};

use crate::state::{Definition, Local, ScopeState, Usage};
use crate::ScopeError;

/// Run the pass over one unit.
pub fn resolve_scopes(tree: &SyntaxTree, source: &str) -> Result<ScopeState, ScopeError> {
    ResolveScopes::new(tree, source).run()
}

/// Names consisting only of underscores (`_`, `__`, ...) are placeholders,
/// not variables. They are dropped at the point of classification.
fn is_underscore_only(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b == b'_')
}

fn is_bind_macro_name(name: &str) -> bool {
    name == "@bind" || name == "@bindname"
}

/// A bare `global x` / `local x` declaration, waiting for a later assignment
/// to `x` within `scope`.
#[derive(Debug)]
struct PendingDeclaration {
    name: SmolStr,
    scope: Span,
}

/// Identifier spans extracted from the target side of an assignment.
#[derive(Debug, Default)]
struct LhsParts {
    /// Candidate binding sites: plain names, however deeply destructured.
    definitions: Vec<Span>,
    /// Reads performed by the target itself: index and field targets, type
    /// annotations.
    usages: Vec<Span>,
}

/// The scope-resolution pass. Created fresh per run; owns the accumulators,
/// the scope stack and the pending `global`/`local` declarations.
#[derive(Debug)]
pub struct ResolveScopes<'a> {
    tree: &'a SyntaxTree,
    source: &'a str,
    state: ScopeState,
    /// Spans of the currently open lexical scopes, innermost last.
    scope_stack: Vec<Span>,
    global_declared: Vec<PendingDeclaration>,
    local_declared: Vec<PendingDeclaration>,
}

impl<'a> ResolveScopes<'a> {
    pub fn new(tree: &'a SyntaxTree, source: &'a str) -> Self {
        Self {
            tree,
            source,
            state: ScopeState::default(),
            scope_stack: Vec::new(),
            global_declared: Vec::new(),
            local_declared: Vec::new(),
        }
    }

    pub fn run(mut self) -> Result<ScopeState, ScopeError> {
        if let Some(root) = self.tree.root() {
            self.visit(root);
        }
        if !self.scope_stack.is_empty() {
            return Err(ScopeError::UnbalancedScopes {
                depth: self.scope_stack.len(),
            });
        }
        Ok(self.state)
    }

    fn kind(&self, node: NodeId) -> NodeKind {
        self.tree.kind(node)
    }

    fn span(&self, node: NodeId) -> Span {
        self.tree.span(node)
    }

    fn children(&self, node: NodeId) -> &'a [NodeId] {
        self.tree.children(node)
    }

    fn text(&self, node: NodeId) -> &'a str {
        self.tree.text(node, self.source)
    }

    fn parent_kind(&self, node: NodeId) -> Option<NodeKind> {
        self.tree.parent(node).map(|parent| self.tree.kind(parent))
    }

    /// `node` sits directly inside the signature of a `function ... end`.
    fn in_function_signature(&self, node: NodeId) -> bool {
        let Some(parent) = self.tree.parent(node) else {
            return false;
        };
        self.kind(parent) == NodeKind::Signature
            && self.parent_kind(parent) == Some(NodeKind::FunctionDefinition)
    }

    fn is_first_child(&self, node: NodeId) -> bool {
        self.tree
            .parent(node)
            .is_some_and(|parent| self.children(parent).first() == Some(&node))
    }

    /// `node` is the target side of an assignment.
    fn is_assignment_lhs(&self, node: NodeId) -> bool {
        self.parent_kind(node) == Some(NodeKind::Assignment) && self.is_first_child(node)
    }

    // ---- record primitives -------------------------------------------------

    fn define_global(&mut self, span: Span) {
        let name = span.text(self.source);
        if is_underscore_only(name) {
            return;
        }
        self.state
            .definitions
            .insert(SmolStr::new(name), Definition { span });
    }

    fn push_local(&mut self, span: Span, validity: Span) {
        let name = span.text(self.source);
        if is_underscore_only(name) {
            return;
        }
        self.state.locals.push(Local {
            name: SmolStr::new(name),
            definition: span,
            validity,
        });
    }

    fn push_usage(&mut self, span: Span) {
        let name = span.text(self.source);
        if is_underscore_only(name) {
            return;
        }
        let definition = self
            .state
            .find_local_definition(name, span)
            .map(|local| local.definition);
        self.state.usages.push(Usage {
            name: SmolStr::new(name),
            span,
            definition,
        });
    }

    /// A usage recorded without local resolution: `global k += 1` reads the
    /// global `k` even when a local of the same name is in scope.
    fn push_unresolved_usage(&mut self, span: Span) {
        let name = span.text(self.source);
        if is_underscore_only(name) {
            return;
        }
        self.state.usages.push(Usage {
            name: SmolStr::new(name),
            span,
            definition: None,
        });
    }

    /// The binding registrar: classify `span` as a global definition or a
    /// local. Pending bare `global`/`local` declarations take precedence over
    /// the scope stack.
    fn register(&mut self, span: Span) {
        let name = span.text(self.source);
        if is_underscore_only(name) {
            return;
        }
        if self
            .global_declared
            .iter()
            .any(|decl| decl.name == name && decl.scope.contains(span))
        {
            self.define_global(span);
        } else if let Some(validity) = self
            .local_declared
            .iter()
            .find(|decl| decl.name == name && decl.scope.contains(span))
            .map(|decl| decl.scope)
        {
            self.push_local(span, validity);
        } else if self.scope_stack.is_empty() {
            self.define_global(span);
        } else {
            let validity = *self.scope_stack.last().unwrap();
            self.push_local(span, validity);
        }
    }

    /// Register a function name outside the definition's own scope: global at
    /// the top level, a local of the enclosing scope otherwise.
    fn register_outside_innermost(&mut self, span: Span) {
        let innermost = self.scope_stack.pop();
        self.register(span);
        if let Some(scope) = innermost {
            self.scope_stack.push(scope);
        }
    }

    // ---- scope predicate ---------------------------------------------------

    fn creates_scope(&self, node: NodeId) -> bool {
        match self.kind(node) {
            NodeKind::WhileStatement
            | NodeKind::ForStatement
            | NodeKind::TryStatement
            | NodeKind::LetStatement
            | NodeKind::FunctionDefinition
            | NodeKind::MacroDefinition
            | NodeKind::DoClause
            | NodeKind::Generator
            | NodeKind::ArrowFunctionExpression => true,
            // `f(x) = x`, `f(x)::T = x`, `f(x) where T = x`: a disguised
            // function definition opens the body's scope.
            NodeKind::Assignment => self
                .children(node)
                .first()
                .is_some_and(|&lhs| self.lhs_is_function_head(lhs)),
            _ => false,
        }
    }

    /// A call expression, possibly wrapped in binary expressions on the left
    /// (`f(x)::T`, `f(x) where T`).
    fn lhs_is_function_head(&self, node: NodeId) -> bool {
        let mut node = node;
        loop {
            match self.kind(node) {
                NodeKind::CallExpression => return true,
                NodeKind::BinaryExpression => match self.children(node).first() {
                    Some(&first) => node = first,
                    None => return false,
                },
                _ => return false,
            }
        }
    }

    // ---- the walk ----------------------------------------------------------

    fn visit(&mut self, node: NodeId) {
        match self.kind(node) {
            // Quoted code and symbols are data; macro names are not variables.
            NodeKind::QuoteStatement
            | NodeKind::QuoteExpression
            | NodeKind::Symbol
            | NodeKind::MacroIdentifier => return,
            NodeKind::ModuleDefinition => return self.visit_module_definition(node),
            NodeKind::StructDefinition
            | NodeKind::AbstractDefinition
            | NodeKind::PrimitiveDefinition => return self.visit_type_definition(node),
            NodeKind::ImportStatement | NodeKind::UsingStatement => {
                return self.visit_import_statement(node)
            }
            NodeKind::GlobalStatement => return self.visit_global_statement(node),
            NodeKind::LocalStatement => return self.visit_local_statement(node),
            NodeKind::MacrocallExpression => {
                if self.visit_bind_macro(node) {
                    return;
                }
                // Any other macro call: the name is opaque, the arguments are
                // ordinary expressions.
            }
            _ => {}
        }

        let scoped = self.creates_scope(node);
        if scoped {
            self.scope_stack.push(self.span(node));
        }
        self.visit_in_scope(node);
        if scoped {
            self.scope_stack.pop();
        }
    }

    fn visit_in_scope(&mut self, node: NodeId) {
        match self.kind(node) {
            NodeKind::ArrowFunctionExpression => self.visit_arrow_function(node),
            // Anonymous `function (a, b) ... end`: the signature tuple is the
            // parameter list.
            NodeKind::TupleExpression if self.in_function_signature(node) => {
                let bound = self.explore_funcdef_arguments(node);
                for span in bound {
                    self.register(span);
                }
            }
            NodeKind::Identifier | NodeKind::Operator => self.visit_identifier(node),
            NodeKind::Assignment | NodeKind::ForBinding | NodeKind::CatchClause => {
                if !self.visit_assignment_like(node) {
                    self.walk_children(node);
                }
            }
            // Do-block parameters: `f(xs) do x, y`. Only the binding sites
            // count here.
            NodeKind::Parameters => {
                let parts = self.explore_assignment_lhs(node);
                for span in parts.definitions {
                    self.register(span);
                }
            }
            NodeKind::Field => {}
            NodeKind::BinaryExpression => {
                if !self.visit_annotated_signature(node) {
                    self.walk_children(node);
                }
            }
            NodeKind::CallExpression => {
                if !self.visit_call_signature(node) {
                    self.walk_children(node);
                }
            }
            NodeKind::Generator => self.visit_generator(node),
            _ => self.walk_children(node),
        }
    }

    fn walk_children(&mut self, node: NodeId) {
        for &child in self.children(node) {
            self.visit(child);
        }
    }

    fn visit_identifier(&mut self, node: NodeId) {
        // `function g end`: the identifier sits directly in the signature and
        // names the function, outside the definition's own scope.
        if self.kind(node) == NodeKind::Identifier && self.in_function_signature(node) {
            self.register_outside_innermost(self.span(node));
            return;
        }
        // A call-site keyword label (`f(k = 2)`) is neither a usage nor a
        // definition. Definition-site keyword parameters never reach the
        // generic walk.
        if self.parent_kind(node) == Some(NodeKind::KwArg) && self.is_first_child(node) {
            return;
        }
        let span = self.span(node);
        let name = span.text(self.source);
        if is_underscore_only(name) {
            return;
        }
        let definition = self
            .state
            .find_local_definition(name, span)
            .map(|local| local.definition);
        // A reference to a `where` type parameter from inside a brace list is
        // part of the annotation, not a value usage.
        if definition.is_some() && self.parent_kind(node) == Some(NodeKind::BraceExpression) {
            return;
        }
        self.state.usages.push(Usage {
            name: SmolStr::new(name),
            span,
            definition,
        });
    }

    /// Value assignments, `for` bindings and `catch` bindings share one
    /// shape: a target, an operator, a right-hand side walked for usages.
    /// Returns `false` for a disguised function definition, which the
    /// signature explorers pick up during generic descent.
    fn visit_assignment_like(&mut self, node: NodeId) -> bool {
        let children = self.children(node);
        let mut pos = 0;
        if children.first().is_some_and(|&first| self.text(first) == "catch") {
            pos = 1;
        }
        let Some(&lhs) = children.get(pos) else {
            return true;
        };
        if self.lhs_is_function_head(lhs) {
            return false;
        }
        let parts = self.explore_assignment_lhs(lhs);

        if pos + 1 < children.len() {
            pos += 1;
        }
        let op = children[pos];
        let is_update = self.kind(op) == NodeKind::UpdateOp;
        let is_broadcast = self.text(op).starts_with('.');

        for &span in &parts.usages {
            self.push_usage(span);
        }
        if is_broadcast {
            // `.=` and `.+=` mutate elements of the target; the name itself
            // is only read, never bound.
            for &span in &parts.definitions {
                self.push_usage(span);
            }
        } else if is_update {
            // Read before write.
            for &span in &parts.definitions {
                self.push_usage(span);
            }
            // Update operators never introduce locals; at the top level they
            // (re)define the global.
            if self.scope_stack.is_empty() {
                for &span in &parts.definitions {
                    self.register(span);
                }
            }
        } else {
            for &span in &parts.definitions {
                self.register(span);
            }
        }

        if pos + 1 < children.len() {
            pos += 1;
        }
        self.visit(children[pos]);
        true
    }

    // ---- assignment targets ------------------------------------------------

    fn explore_assignment_lhs(&self, node: NodeId) -> LhsParts {
        let mut parts = LhsParts::default();
        self.collect_lhs(node, &mut parts);
        parts
    }

    fn collect_lhs(&self, node: NodeId, parts: &mut LhsParts) {
        match self.kind(node) {
            // `x::T = ...`: the annotation's identifiers are reads.
            NodeKind::Type => self.collect_identifiers(node, &mut parts.usages),
            // `A{B} = ...`: brace contents are type parameters, not targets.
            NodeKind::BraceExpression => {}
            NodeKind::Identifier | NodeKind::MacroIdentifier | NodeKind::Operator => {
                parts.definitions.push(self.span(node));
            }
            // `a[i] = ...` / `a.f = ...`: mutates an object, reads the names.
            NodeKind::IndexExpression | NodeKind::FieldExpression => {
                self.collect_index_target(node, &mut parts.usages);
            }
            _ => {
                for &child in self.children(node) {
                    self.collect_lhs(child, parts);
                }
            }
        }
    }

    /// Every identifier in the subtree, depth first.
    fn collect_identifiers(&self, node: NodeId, out: &mut Vec<Span>) {
        if self.kind(node) == NodeKind::Identifier {
            out.push(self.span(node));
        }
        for &child in self.children(node) {
            self.collect_identifiers(child, out);
        }
    }

    /// Identifiers read by an index/field target, skipping field names.
    fn collect_index_target(&self, node: NodeId, out: &mut Vec<Span>) {
        if self.kind(node) == NodeKind::Field {
            return;
        }
        if self.kind(node) == NodeKind::Identifier {
            out.push(self.span(node));
        }
        for &child in self.children(node) {
            self.collect_index_target(child, out);
        }
    }

    // ---- function signatures -----------------------------------------------

    /// A call expression that is really a function-definition head: the
    /// signature of a `function ... end`, or the target of `f(x) = x`.
    fn visit_call_signature(&mut self, node: NodeId) -> bool {
        if !(self.in_function_signature(node) || self.is_assignment_lhs(node)) {
            return false;
        }
        self.register_head_and_params(node);
        true
    }

    /// A binary expression wrapping a function-definition head:
    /// `f(x)::T = x`, `f(x) where T = x`, or the signature of
    /// `function f(x) where T ... end`.
    fn visit_annotated_signature(&mut self, node: NodeId) -> bool {
        if self.is_assignment_lhs(node) {
            let Some(call) = self.find_function_head(node) else {
                return false;
            };
            self.register_where_params(call);
            self.register_head_and_params(call);
            self.walk_annotation_rest(node, call);
            true
        } else if self.in_function_signature(node) {
            let Some(&call) = self.children(node).first() else {
                return false;
            };
            if self.kind(call) != NodeKind::CallExpression {
                return false;
            }
            self.register_where_params(call);
            self.register_head_and_params(call);
            self.walk_where_constraints(node);
            true
        } else {
            false
        }
    }

    /// The call expression at the bottom left of nested binary expressions.
    fn find_function_head(&self, node: NodeId) -> Option<NodeId> {
        let mut node = node;
        loop {
            match self.kind(node) {
                NodeKind::CallExpression => return Some(node),
                NodeKind::BinaryExpression => node = *self.children(node).first()?,
                _ => return None,
            }
        }
    }

    /// Register the function name and its parameter list.
    fn register_head_and_params(&mut self, call: NodeId) {
        let children = self.children(call);
        let mut pos = 0;
        if let Some(&head) = children.first() {
            if matches!(
                self.kind(head),
                NodeKind::Identifier | NodeKind::Operator | NodeKind::FieldExpression
            ) {
                // Method extensions (`Base.show(...) = ...`) register the
                // full dotted text.
                self.register_outside_innermost(self.span(head));
                pos = 1;
            }
        }
        if let Some(&params) = children.get(pos) {
            let bound = self.explore_funcdef_arguments(params);
            for span in bound {
                self.register(span);
            }
        }
    }

    /// Register `where` type parameters, scoped to the whole signature. Runs
    /// before the parameter list so that annotations referencing them resolve
    /// as locals.
    fn register_where_params(&mut self, call: NodeId) {
        let Some(parent) = self.tree.parent(call) else {
            return;
        };
        if self.kind(parent) != NodeKind::BinaryExpression {
            return;
        }
        let children = self.children(parent);
        let Some(where_pos) = children.iter().position(|&c| self.text(c) == "where") else {
            return;
        };
        let Some(&ty) = children.get(where_pos + 1) else {
            return;
        };
        if self.kind(ty) != NodeKind::Type {
            return;
        }
        let Some(&inner) = self.children(ty).first() else {
            return;
        };
        match self.kind(inner) {
            // `where T`
            NodeKind::Identifier => self.register(self.span(inner)),
            // `where {T, S <: R}`
            NodeKind::BraceExpression => {
                for &param in self.children(inner) {
                    match self.kind(param) {
                        NodeKind::Identifier => self.register(self.span(param)),
                        NodeKind::BinaryExpression => {
                            if let Some(&name) = self.children(param).first() {
                                if self.kind(name) == NodeKind::Identifier {
                                    self.register(self.span(name));
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    /// Walk the annotation parts around the head of `f(x)::T = x` /
    /// `f(x) where T = x`: a return type is read normally, a `where` list
    /// contributes only its constraint bounds (`R` in `S <: R`).
    fn walk_annotation_rest(&mut self, node: NodeId, call: NodeId) {
        let mut prev_was_where = false;
        for &child in self.children(node) {
            if child == call {
                continue;
            }
            let text = self.text(child);
            if text == "::" {
                prev_was_where = false;
                continue;
            }
            if text == "where" {
                prev_was_where = true;
                continue;
            }
            if prev_was_where && self.kind(child) == NodeKind::Type {
                self.walk_type_constraints(child);
            } else {
                self.visit(child);
            }
            prev_was_where = false;
        }
    }

    fn walk_where_constraints(&mut self, node: NodeId) {
        let children = self.children(node);
        let Some(where_pos) = children.iter().position(|&c| self.text(c) == "where") else {
            return;
        };
        if let Some(&ty) = children.get(where_pos + 1) {
            if self.kind(ty) == NodeKind::Type {
                self.walk_type_constraints(ty);
            }
        }
    }

    /// In `where {T, S <: R}` only the bounds are reads; the parameters
    /// themselves were already bound as locals.
    fn walk_type_constraints(&mut self, ty: NodeId) {
        let Some(&inner) = self.children(ty).first() else {
            return;
        };
        if self.kind(inner) != NodeKind::BraceExpression {
            return;
        }
        for &param in self.children(inner) {
            if self.kind(param) == NodeKind::BinaryExpression {
                if let Some(&bound) = self.children(param).get(2) {
                    self.visit(bound);
                }
            }
        }
    }

    // ---- parameter lists ---------------------------------------------------

    /// Walk a parameter list and return the spans of the bound parameter
    /// names. Default values and type annotations are walked for usages on
    /// the way through.
    fn explore_funcdef_arguments(&mut self, node: NodeId) -> Vec<Span> {
        let mut bound = Vec::new();
        for &child in self.children(node) {
            if self.kind(child) == NodeKind::KeywordArguments {
                for &kwarg in self.children(child) {
                    self.explore_argument(kwarg, &mut bound);
                }
                break;
            }
            self.explore_argument(child, &mut bound);
        }
        bound
    }

    fn explore_argument(&mut self, node: NodeId, bound: &mut Vec<Span>) {
        let children = self.children(node);
        match self.kind(node) {
            NodeKind::Identifier | NodeKind::Operator => bound.push(self.span(node)),
            // `k = default`
            NodeKind::KwArg => {
                if let Some(&name) = children.first() {
                    self.explore_argument(name, bound);
                }
                if let Some(&default) = children.get(2) {
                    self.visit(default);
                }
            }
            // `x::T`
            NodeKind::BinaryExpression => {
                if let Some(&name) = children.first() {
                    self.explore_argument(name, bound);
                }
                if let Some(&annotation) = children.get(2) {
                    self.visit(annotation);
                }
            }
            // `::T` with no parameter name
            NodeKind::UnaryExpression => {
                if let Some(&annotation) = children.get(1) {
                    self.visit(annotation);
                }
            }
            // `xs...`
            NodeKind::SplatExpression => {
                if let Some(&inner) = children.first() {
                    self.explore_argument(inner, bound);
                }
            }
            // `(x, y)` destructured parameter
            NodeKind::TupleExpression => {
                for &child in children {
                    self.explore_argument(child, bound);
                }
            }
            NodeKind::Type => self.visit(node),
            _ => {}
        }
    }

    // ---- anonymous functions -----------------------------------------------

    fn visit_arrow_function(&mut self, node: NodeId) {
        let children = self.children(node);
        let Some(&params) = children.first() else {
            return;
        };
        match self.kind(params) {
            NodeKind::Identifier => self.register(self.span(params)),
            NodeKind::TupleExpression => {
                let bound = self.explore_funcdef_arguments(params);
                for span in bound {
                    self.register(span);
                }
            }
            _ => {}
        }
        for &child in &children[1..] {
            if self.text(child) != "->" {
                self.visit(child);
            }
        }
    }

    // ---- generators --------------------------------------------------------

    /// Binding clauses first (they introduce the locals), then the result
    /// expression, which may reference a variable of any clause regardless of
    /// textual order.
    fn visit_generator(&mut self, node: NodeId) {
        let Some((&head, clauses)) = self.children(node).split_first() else {
            return;
        };
        for &clause in clauses {
            self.visit(clause);
        }
        self.visit(head);
    }

    // ---- declarative definitions -------------------------------------------

    /// `module M ... end` defines `M`; the body is a separate world and is
    /// not traversed.
    fn visit_module_definition(&mut self, node: NodeId) {
        if let Some(&name) = self.children(node).get(1) {
            if self.kind(name) == NodeKind::Identifier {
                self.define_global(self.span(name));
            }
        }
    }

    /// `struct` / `abstract type` / `primitive type`: the declared name is a
    /// global definition, the body is opaque.
    fn visit_type_definition(&mut self, node: NodeId) {
        let Some(&head) = self
            .children(node)
            .iter()
            .skip(1)
            .find(|&&child| self.kind(child) == NodeKind::TypeHead)
        else {
            return;
        };
        let Some(&first) = self.children(head).first() else {
            return;
        };
        if let Some(span) = self.declared_type_name(first) {
            self.define_global(span);
        }
    }

    /// The name under a type head: plain, parametrized (`T{P}`), or the left
    /// side of a supertype relation (`T <: S`).
    fn declared_type_name(&self, node: NodeId) -> Option<Span> {
        match self.kind(node) {
            NodeKind::Identifier => Some(self.span(node)),
            NodeKind::ParametrizedExpression => {
                let &first = self.children(node).first()?;
                (self.kind(first) == NodeKind::Identifier).then(|| self.span(first))
            }
            NodeKind::BinaryExpression => {
                let &first = self.children(node).first()?;
                self.declared_type_name(first)
            }
            _ => None,
        }
    }

    // ---- imports -----------------------------------------------------------

    /// Imports bind globally no matter how deeply nested the statement is.
    fn visit_import_statement(&mut self, node: NodeId) {
        for span in self.explore_import_statement(node) {
            self.define_global(span);
        }
    }

    fn explore_import_statement(&self, node: NodeId) -> Vec<Span> {
        let mut found = Vec::new();
        // The first child is the `import`/`using` keyword.
        for &child in self.children(node).iter().skip(1) {
            match self.kind(child) {
                // `import X: a, b` binds only the names after the colon.
                NodeKind::SelectedImport => {
                    let mut saw_colon = false;
                    for &part in self.children(child) {
                        if self.text(part) == ":" {
                            saw_colon = true;
                        } else if saw_colon && self.kind(part) == NodeKind::ImportPath {
                            found.extend(self.last_path_identifier(part));
                        }
                    }
                }
                // `import X.Y` binds `Y`.
                NodeKind::ImportPath => found.extend(self.last_path_identifier(child)),
                _ => {}
            }
        }
        found
    }

    fn last_path_identifier(&self, path: NodeId) -> Option<Span> {
        self.children(path)
            .iter()
            .rev()
            .find(|&&child| self.kind(child) == NodeKind::Identifier)
            .map(|&child| self.span(child))
    }

    // ---- scope-override statements -----------------------------------------

    fn visit_global_statement(&mut self, node: NodeId) {
        let Some(&payload) = self.children(node).get(1) else {
            return;
        };
        match self.kind(payload) {
            // `global k = 3` / `global a, b = 1, 2` / `global k += 3`
            NodeKind::Assignment => {
                let children = self.children(payload);
                let Some(&lhs) = children.first() else {
                    return;
                };
                let parts = self.explore_assignment_lhs(lhs);
                let is_update = children
                    .get(1)
                    .is_some_and(|&op| self.kind(op) == NodeKind::UpdateOp);
                for &span in &parts.usages {
                    self.push_usage(span);
                }
                if is_update {
                    for &span in &parts.definitions {
                        self.push_unresolved_usage(span);
                    }
                }
                // The targets land in the definitions map, scope stack or not.
                for &span in &parts.definitions {
                    self.define_global(span);
                }
                if let Some(&rhs) = children.get(2) {
                    self.visit(rhs);
                }
            }
            // `global k`
            NodeKind::Identifier => {
                let scope = self.declaration_scope(node);
                self.push_pending_global(payload, scope);
            }
            // `global x, y, z`
            NodeKind::OpenTuple => {
                let scope = self.declaration_scope(node);
                for &item in self.children(payload) {
                    if self.kind(item) == NodeKind::Identifier {
                        self.push_pending_global(item, scope);
                    }
                }
            }
            _ => {}
        }
    }

    fn visit_local_statement(&mut self, node: NodeId) {
        let validity = self.declaration_scope(node);
        let Some(&payload) = self.children(node).get(1) else {
            return;
        };
        match self.kind(payload) {
            // `local k = 3` / `local a, b = 1, 2` / `local k += 3`
            NodeKind::Assignment => {
                let children = self.children(payload);
                let Some(&lhs) = children.first() else {
                    return;
                };
                let parts = self.explore_assignment_lhs(lhs);
                for &span in &parts.usages {
                    self.push_usage(span);
                }
                // Even for an update operator the target reads no outer
                // binding; the candidates go straight into the locals.
                for &span in &parts.definitions {
                    self.push_local(span, validity);
                }
                if let Some(&rhs) = children.get(2) {
                    self.visit(rhs);
                }
            }
            // `local k`
            NodeKind::Identifier => self.push_pending_local(payload, validity),
            // `local a, b`
            NodeKind::OpenTuple => {
                for &item in self.children(payload) {
                    if self.kind(item) == NodeKind::Identifier {
                        self.push_pending_local(item, validity);
                    }
                }
            }
            _ => {}
        }
    }

    fn push_pending_global(&mut self, node: NodeId, scope: Span) {
        self.global_declared.push(PendingDeclaration {
            name: SmolStr::new(self.text(node)),
            scope,
        });
    }

    fn push_pending_local(&mut self, node: NodeId, scope: Span) {
        self.local_declared.push(PendingDeclaration {
            name: SmolStr::new(self.text(node)),
            scope,
        });
    }

    /// The scope a bare `global`/`local` declaration attaches to: the
    /// innermost open scope, else the statement's enclosing block, else the
    /// whole unit.
    fn declaration_scope(&self, statement: NodeId) -> Span {
        if let Some(&scope) = self.scope_stack.last() {
            return scope;
        }
        if let Some(parent) = self.tree.parent(statement) {
            return self.tree.span(parent);
        }
        Span::new(0, self.source.len() as u32)
    }

    // ---- the bind macro ----------------------------------------------------

    /// `@bind name expr` (also the qualified `Module.@bind`) defines `name`
    /// and reads the remaining arguments. Returns whether the call was
    /// consumed; anything else falls back to the generic walk.
    fn visit_bind_macro(&mut self, node: NodeId) -> bool {
        let children = self.children(node);
        let Some(&head) = children.first() else {
            return false;
        };
        let is_bind = match self.kind(head) {
            NodeKind::MacroIdentifier => is_bind_macro_name(self.text(head)),
            NodeKind::FieldExpression => self.children(head).last().is_some_and(|&last| {
                self.kind(last) == NodeKind::MacroIdentifier
                    && is_bind_macro_name(self.text(last))
            }),
            _ => false,
        };
        if !is_bind {
            return false;
        }
        let Some(&args) = children.get(1) else {
            return false;
        };
        if self.kind(args) != NodeKind::MacroArguments {
            return false;
        }
        let arg_children = self.children(args);
        let Some(&first) = arg_children.first() else {
            return false;
        };
        // Only a plain identifier in first position makes this a binding.
        if self.kind(first) != NodeKind::Identifier {
            return false;
        }
        self.register(self.span(first));
        for &rest in &arg_children[1..] {
            self.visit(rest);
        }
        true
    }
}
