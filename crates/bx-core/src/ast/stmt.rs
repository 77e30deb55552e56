use serde::{Deserialize, Serialize};

use crate::ast::{Attribute, Expr, Function, Ident, TypeHint};
use crate::span::Span;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    Expr(Expr),
    VarDecl {
        name: Ident,
        init: Option<Expr>,
    },
    If {
        cond: Expr,
        then_branch: Block,
        else_branch: Option<ElseBranch>,
    },
    While {
        cond: Expr,
        body: Block,
    },
    DoWhile {
        body: Block,
        cond: Expr,
    },
    For {
        init: Option<ForInit>,
        cond: Option<Expr>,
        step: Option<Expr>,
        body: Block,
    },
    ForIn {
        var: Ident,
        /// Written as `for (var x in ...)`.
        declared: bool,
        collection: Expr,
        body: Block,
    },
    /// Row-by-row iteration over a query result.
    QueryLoop {
        query: Expr,
        item: Option<Ident>,
        body: Block,
    },
    Switch {
        subject: Expr,
        cases: Vec<SwitchCase>,
    },
    Try {
        body: Block,
        catches: Vec<CatchClause>,
        finally: Option<Block>,
    },
    Throw(Option<Expr>),
    Rethrow,
    Return(Option<Expr>),
    Break,
    Continue,
    /// Text emitted to the response, from template text or `<cfoutput>`.
    Output(Expr),
    Block(Block),
    Function(Box<Function>),
    TagInvocation(TagInvocation),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElseBranch {
    If(Box<Stmt>),
    Block(Block),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ForInit {
    Var { name: Ident, init: Expr },
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    /// Empty for `default`.
    pub values: Vec<Expr>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

impl SwitchCase {
    pub fn is_default(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    pub exception_type: Option<TypeHint>,
    pub var: Ident,
    pub body: Block,
    pub span: Span,
}

/// A tag with no dedicated statement form, e.g. `<cfmail>` or `cfheader(...)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagInvocation {
    pub name: Ident,
    pub attributes: Vec<Attribute>,
    pub body: Option<Block>,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            StmtKind::Expr(_) => "expression statement",
            StmtKind::VarDecl { .. } => "variable declaration",
            StmtKind::If { .. } => "if",
            StmtKind::While { .. } => "while",
            StmtKind::DoWhile { .. } => "do-while",
            StmtKind::For { .. } => "for",
            StmtKind::ForIn { .. } => "for-in",
            StmtKind::QueryLoop { .. } => "query loop",
            StmtKind::Switch { .. } => "switch",
            StmtKind::Try { .. } => "try",
            StmtKind::Throw(_) => "throw",
            StmtKind::Rethrow => "rethrow",
            StmtKind::Return(_) => "return",
            StmtKind::Break => "break",
            StmtKind::Continue => "continue",
            StmtKind::Output(_) => "output",
            StmtKind::Block(_) => "block",
            StmtKind::Function(_) => "function declaration",
            StmtKind::TagInvocation(_) => "tag invocation",
        }
    }
}

impl Block {
    pub fn new(stmts: Vec<Stmt>, span: Span) -> Self {
        Self { stmts, span }
    }
}
