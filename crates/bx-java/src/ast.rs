//! Java syntax tree.
//!
//! Only the subset lowering produces is modelled. Parentheses are explicit
//! [`JExpr::Paren`] nodes: the smart constructors ([`JExpr::binary`],
//! [`JExpr::unary`], ...) insert them from Java precedence so the printer
//! never has to reason about grouping.

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompilationUnit {
    pub package: Option<String>,
    pub imports: Vec<Import>,
    pub types: Vec<TypeDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Import {
    pub path: String,
    pub is_static: bool,
}

impl Import {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_static: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum Modifier {
    #[display("public")]
    Public,
    #[display("protected")]
    Protected,
    #[display("private")]
    Private,
    #[display("static")]
    Static,
    #[display("final")]
    Final,
    #[display("abstract")]
    Abstract,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub doc: Option<String>,
    pub modifiers: Vec<Modifier>,
    pub name: String,
    pub extends: Option<JType>,
    pub implements: Vec<JType>,
    pub members: Vec<Member>,
}

impl TypeDecl {
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            doc: None,
            modifiers: vec![Modifier::Public],
            name: name.into(),
            extends: None,
            implements: Vec::new(),
            members: Vec::new(),
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDecl> {
        self.members.iter().filter_map(|member| match member {
            Member::Field(field) => Some(field),
            _ => None,
        })
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDecl> {
        self.members.iter().filter_map(|member| match member {
            Member::Method(method) => Some(method),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, From, Serialize, Deserialize)]
pub enum Member {
    Field(FieldDecl),
    Constructor(ConstructorDecl),
    Method(MethodDecl),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub doc: Option<String>,
    pub modifiers: Vec<Modifier>,
    pub ty: JType,
    pub name: String,
    pub init: Option<JExpr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructorDecl {
    pub doc: Option<String>,
    pub modifiers: Vec<Modifier>,
    pub name: String,
    pub params: Vec<Param>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub doc: Option<String>,
    pub modifiers: Vec<Modifier>,
    pub return_type: JType,
    pub name: String,
    pub params: Vec<Param>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub ty: JType,
    pub name: String,
}

impl Param {
    pub fn new(ty: JType, name: impl Into<String>) -> Self {
        Self {
            ty,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum Primitive {
    #[display("boolean")]
    Boolean,
    #[display("int")]
    Int,
    #[display("long")]
    Long,
    #[display("float")]
    Float,
    #[display("double")]
    Double,
}

impl Primitive {
    /// Wrapper class used where the value may be `null`.
    pub fn boxed(self) -> &'static str {
        match self {
            Primitive::Boolean => "Boolean",
            Primitive::Int => "Integer",
            Primitive::Long => "Long",
            Primitive::Float => "Float",
            Primitive::Double => "Double",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JType {
    Void,
    Primitive(Primitive),
    /// Class or interface, possibly parameterized: `Map<String, Object>`.
    Class { name: String, args: Vec<JType> },
}

impl JType {
    pub fn class(name: impl Into<String>) -> Self {
        JType::Class {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<JType>) -> Self {
        JType::Class {
            name: name.into(),
            args,
        }
    }

    pub fn object() -> Self {
        Self::class("Object")
    }

    pub fn string() -> Self {
        Self::class("String")
    }

    pub fn is_void(&self) -> bool {
        matches!(self, JType::Void)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, JType::Class { name, args } if name == "Object" && args.is_empty())
    }

    /// Primitives become their wrapper class; other types are unchanged.
    pub fn boxed(&self) -> JType {
        match self {
            JType::Primitive(primitive) => JType::class(primitive.boxed()),
            other => other.clone(),
        }
    }
}

impl std::fmt::Display for JType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JType::Void => f.write_str("void"),
            JType::Primitive(primitive) => write!(f, "{}", primitive),
            JType::Class { name, args } if args.is_empty() => f.write_str(name),
            JType::Class { name, args } => {
                write!(f, "{}<", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(">")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<JStmt>,
}

impl Block {
    pub fn new(stmts: Vec<JStmt>) -> Self {
        Self { stmts }
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }

    /// Whether control can reach the end of the block, following Java's
    /// reachability rules. A `switch` is assumed to complete.
    pub fn completes_normally(&self) -> bool {
        self.stmts.iter().all(JStmt::completes_normally)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JStmt {
    Local {
        ty: JType,
        name: String,
        init: Option<JExpr>,
    },
    Expr(JExpr),
    If {
        cond: JExpr,
        then_block: Block,
        else_branch: Option<JElse>,
    },
    While {
        cond: JExpr,
        body: Block,
    },
    DoWhile {
        body: Block,
        cond: JExpr,
    },
    For {
        init: Option<JForInit>,
        cond: Option<JExpr>,
        update: Vec<JExpr>,
        body: Block,
    },
    ForEach {
        ty: JType,
        name: String,
        iterable: JExpr,
        body: Block,
    },
    Switch {
        subject: JExpr,
        cases: Vec<JSwitchCase>,
    },
    Try {
        body: Block,
        catches: Vec<JCatch>,
        finally: Option<Block>,
    },
    Throw(JExpr),
    Return(Option<JExpr>),
    Break,
    Continue,
    Block(Block),
}

impl JStmt {
    pub fn completes_normally(&self) -> bool {
        match self {
            JStmt::Return(_) | JStmt::Throw(_) => false,
            JStmt::Block(block) => block.completes_normally(),
            JStmt::If {
                then_block,
                else_branch: Some(branch),
                ..
            } => {
                then_block.completes_normally()
                    || match branch {
                        JElse::If(stmt) => stmt.completes_normally(),
                        JElse::Block(block) => block.completes_normally(),
                    }
            }
            JStmt::Try {
                body,
                catches,
                finally,
            } => {
                finally.as_ref().map_or(true, Block::completes_normally)
                    && (body.completes_normally()
                        || catches.iter().any(|catch| catch.body.completes_normally()))
            }
            JStmt::While {
                cond: JExpr::Literal(JLiteral::Bool(true)),
                body,
            }
            | JStmt::For {
                cond: None, body, ..
            } => body.stmts.iter().any(breaks_loop),
            _ => true,
        }
    }
}

/// Whether `stmt` contains a `break` of the loop around it. Nested loops and
/// switches own their breaks.
fn breaks_loop(stmt: &JStmt) -> bool {
    let any = |block: &Block| block.stmts.iter().any(breaks_loop);
    match stmt {
        JStmt::Break => true,
        JStmt::Block(block) => any(block),
        JStmt::If {
            then_block,
            else_branch,
            ..
        } => {
            any(then_block)
                || match else_branch {
                    Some(JElse::If(stmt)) => breaks_loop(stmt),
                    Some(JElse::Block(block)) => any(block),
                    None => false,
                }
        }
        JStmt::Try {
            body,
            catches,
            finally,
        } => {
            any(body)
                || catches.iter().any(|catch| any(&catch.body))
                || finally.as_ref().is_some_and(any)
        }
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JElse {
    If(Box<JStmt>),
    Block(Block),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JForInit {
    Local {
        ty: JType,
        name: String,
        init: JExpr,
    },
    Exprs(Vec<JExpr>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JSwitchCase {
    /// Empty for `default:`.
    pub labels: Vec<JExpr>,
    pub body: Vec<JStmt>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JCatch {
    pub ty: JType,
    pub name: String,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JLiteral {
    Null,
    Bool(bool),
    /// Numeric text as it will be printed, e.g. `1`, `2.5`, `1e3`.
    Number(String),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum JBinaryOp {
    #[display("+")]
    Add,
    #[display("-")]
    Sub,
    #[display("*")]
    Mul,
    #[display("/")]
    Div,
    #[display("%")]
    Rem,
    #[display("==")]
    Eq,
    #[display("!=")]
    Ne,
    #[display("<")]
    Lt,
    #[display("<=")]
    Le,
    #[display(">")]
    Gt,
    #[display(">=")]
    Ge,
    #[display("&&")]
    And,
    #[display("||")]
    Or,
    #[display("^")]
    Xor,
}

impl JBinaryOp {
    pub fn precedence(self) -> u8 {
        match self {
            JBinaryOp::Or => prec::OR,
            JBinaryOp::And => prec::AND,
            JBinaryOp::Xor => prec::XOR,
            JBinaryOp::Eq | JBinaryOp::Ne => prec::EQUALITY,
            JBinaryOp::Lt | JBinaryOp::Le | JBinaryOp::Gt | JBinaryOp::Ge => prec::RELATIONAL,
            JBinaryOp::Add | JBinaryOp::Sub => prec::ADDITIVE,
            JBinaryOp::Mul | JBinaryOp::Div | JBinaryOp::Rem => prec::MULTIPLICATIVE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JUnaryOp {
    Neg,
    Plus,
    Not,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl JUnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            JUnaryOp::Neg => "-",
            JUnaryOp::Plus => "+",
            JUnaryOp::Not => "!",
            JUnaryOp::PreInc | JUnaryOp::PostInc => "++",
            JUnaryOp::PreDec | JUnaryOp::PostDec => "--",
        }
    }

    pub fn is_postfix(self) -> bool {
        matches!(self, JUnaryOp::PostInc | JUnaryOp::PostDec)
    }

    pub fn is_update(self) -> bool {
        matches!(
            self,
            JUnaryOp::PreInc | JUnaryOp::PreDec | JUnaryOp::PostInc | JUnaryOp::PostDec
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum JAssignOp {
    #[display("=")]
    Assign,
    #[display("+=")]
    Add,
    #[display("-=")]
    Sub,
    #[display("*=")]
    Mul,
    #[display("/=")]
    Div,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JExpr {
    Literal(JLiteral),
    Name(String),
    This,
    FieldAccess {
        target: Box<JExpr>,
        name: String,
    },
    /// `target.name(args)`, or an unqualified call when `target` is `None`.
    MethodCall {
        target: Option<Box<JExpr>>,
        name: String,
        args: Vec<JExpr>,
    },
    New {
        ty: JType,
        args: Vec<JExpr>,
    },
    Binary {
        op: JBinaryOp,
        lhs: Box<JExpr>,
        rhs: Box<JExpr>,
    },
    Unary {
        op: JUnaryOp,
        operand: Box<JExpr>,
    },
    Assign {
        op: JAssignOp,
        target: Box<JExpr>,
        value: Box<JExpr>,
    },
    Conditional {
        cond: Box<JExpr>,
        then_expr: Box<JExpr>,
        else_expr: Box<JExpr>,
    },
    Cast {
        ty: JType,
        expr: Box<JExpr>,
    },
    Paren(Box<JExpr>),
    /// `(params) -> { body }`.
    Lambda {
        params: Vec<Param>,
        body: Block,
    },
}

/// Java operator precedence levels, loosest first.
pub mod prec {
    pub const ASSIGN: u8 = 1;
    pub const CONDITIONAL: u8 = 2;
    pub const OR: u8 = 3;
    pub const AND: u8 = 4;
    pub const XOR: u8 = 6;
    pub const EQUALITY: u8 = 8;
    pub const RELATIONAL: u8 = 9;
    pub const ADDITIVE: u8 = 11;
    pub const MULTIPLICATIVE: u8 = 12;
    pub const PREFIX: u8 = 13;
    pub const POSTFIX: u8 = 14;
    pub const PRIMARY: u8 = 15;
}

impl JExpr {
    pub fn null() -> Self {
        JExpr::Literal(JLiteral::Null)
    }

    pub fn bool(value: bool) -> Self {
        JExpr::Literal(JLiteral::Bool(value))
    }

    pub fn number(text: impl Into<String>) -> Self {
        JExpr::Literal(JLiteral::Number(text.into()))
    }

    pub fn string(text: impl Into<String>) -> Self {
        JExpr::Literal(JLiteral::String(text.into()))
    }

    pub fn name(name: impl Into<String>) -> Self {
        JExpr::Name(name.into())
    }

    pub fn is_string_literal(&self) -> bool {
        matches!(self, JExpr::Literal(JLiteral::String(_)))
    }

    pub fn precedence(&self) -> u8 {
        match self {
            JExpr::Literal(JLiteral::Number(text)) if text.starts_with('-') => prec::PREFIX,
            JExpr::Literal(_) | JExpr::Name(_) | JExpr::This | JExpr::Paren(_) => prec::PRIMARY,
            JExpr::FieldAccess { .. } | JExpr::MethodCall { .. } => prec::POSTFIX,
            JExpr::New { .. } => prec::POSTFIX,
            JExpr::Unary { op, .. } if op.is_postfix() => prec::POSTFIX,
            JExpr::Unary { .. } | JExpr::Cast { .. } => prec::PREFIX,
            JExpr::Binary { op, .. } => op.precedence(),
            JExpr::Conditional { .. } => prec::CONDITIONAL,
            JExpr::Assign { .. } | JExpr::Lambda { .. } => prec::ASSIGN,
        }
    }

    /// Whether Java accepts the expression as a statement on its own.
    pub fn is_statement_expr(&self) -> bool {
        match self {
            JExpr::Assign { .. } | JExpr::MethodCall { .. } | JExpr::New { .. } => true,
            JExpr::Unary { op, .. } => op.is_update(),
            _ => false,
        }
    }

    /// Whether evaluating the expression can do more than produce a value.
    /// Arithmetic and casts count as pure.
    pub fn has_side_effects(&self) -> bool {
        match self {
            JExpr::Literal(_) | JExpr::Name(_) | JExpr::This | JExpr::Lambda { .. } => false,
            JExpr::MethodCall { .. } | JExpr::New { .. } | JExpr::Assign { .. } => true,
            JExpr::Unary { op, operand } => op.is_update() || operand.has_side_effects(),
            JExpr::FieldAccess { target, .. } => target.has_side_effects(),
            JExpr::Binary { lhs, rhs, .. } => lhs.has_side_effects() || rhs.has_side_effects(),
            JExpr::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                cond.has_side_effects()
                    || then_expr.has_side_effects()
                    || else_expr.has_side_effects()
            }
            JExpr::Cast { expr, .. } => expr.has_side_effects(),
            JExpr::Paren(inner) => inner.has_side_effects(),
        }
    }

    /// Wraps `self` in parentheses unless it binds at least as tightly as `min`.
    pub fn at_least(self, min: u8) -> JExpr {
        if self.precedence() >= min {
            self
        } else {
            JExpr::Paren(Box::new(self))
        }
    }

    /// Left-associative binary operation.
    pub fn binary(op: JBinaryOp, lhs: JExpr, rhs: JExpr) -> JExpr {
        let level = op.precedence();
        JExpr::Binary {
            op,
            lhs: Box::new(lhs.at_least(level)),
            rhs: Box::new(rhs.at_least(level + 1)),
        }
    }

    pub fn unary(op: JUnaryOp, operand: JExpr) -> JExpr {
        let operand = if op.is_postfix() {
            operand.at_least(prec::POSTFIX)
        } else {
            let operand = operand.at_least(prec::PREFIX);
            // `- -x` must not print as `--x`.
            let glued = match (&op, &operand) {
                (JUnaryOp::Neg | JUnaryOp::PreDec, JExpr::Unary { op: inner, .. }) => {
                    matches!(inner, JUnaryOp::Neg | JUnaryOp::PreDec)
                }
                (JUnaryOp::Plus | JUnaryOp::PreInc, JExpr::Unary { op: inner, .. }) => {
                    matches!(inner, JUnaryOp::Plus | JUnaryOp::PreInc)
                }
                (JUnaryOp::Neg, JExpr::Literal(JLiteral::Number(text))) => text.starts_with('-'),
                _ => false,
            };
            if glued {
                JExpr::Paren(Box::new(operand))
            } else {
                operand
            }
        };
        JExpr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn assign(op: JAssignOp, target: JExpr, value: JExpr) -> JExpr {
        JExpr::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value.at_least(prec::ASSIGN)),
        }
    }

    pub fn conditional(cond: JExpr, then_expr: JExpr, else_expr: JExpr) -> JExpr {
        JExpr::Conditional {
            cond: Box::new(cond.at_least(prec::OR)),
            then_expr: Box::new(then_expr.at_least(prec::CONDITIONAL)),
            else_expr: Box::new(else_expr.at_least(prec::CONDITIONAL)),
        }
    }

    pub fn field(target: JExpr, name: impl Into<String>) -> JExpr {
        JExpr::FieldAccess {
            target: Box::new(target.at_least(prec::POSTFIX)),
            name: name.into(),
        }
    }

    /// `target.name(args)`.
    pub fn call(target: JExpr, name: impl Into<String>, args: Vec<JExpr>) -> JExpr {
        JExpr::MethodCall {
            target: Some(Box::new(target.at_least(prec::POSTFIX))),
            name: name.into(),
            args,
        }
    }

    /// `Class.name(args)` for a static helper.
    pub fn static_call(class: &str, name: impl Into<String>, args: Vec<JExpr>) -> JExpr {
        Self::call(JExpr::name(class), name, args)
    }

    pub fn new_object(ty: JType, args: Vec<JExpr>) -> JExpr {
        JExpr::New { ty, args }
    }

    pub fn lambda(params: Vec<Param>, body: Block) -> JExpr {
        JExpr::Lambda { params, body }
    }

    pub fn cast(ty: JType, expr: JExpr) -> JExpr {
        JExpr::Cast {
            ty,
            expr: Box::new(expr.at_least(prec::PREFIX)),
        }
    }
}

impl From<JLiteral> for JExpr {
    fn from(literal: JLiteral) -> Self {
        JExpr::Literal(literal)
    }
}

impl From<JExpr> for JStmt {
    fn from(expr: JExpr) -> Self {
        JStmt::Expr(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_parenthesizes_by_precedence() {
        let sum = JExpr::binary(JBinaryOp::Add, JExpr::name("a"), JExpr::name("b"));
        let product = JExpr::binary(JBinaryOp::Mul, sum.clone(), JExpr::name("c"));
        assert!(matches!(&product, JExpr::Binary { lhs, .. } if matches!(**lhs, JExpr::Paren(_))));

        let nested = JExpr::binary(JBinaryOp::Sub, JExpr::name("a"), sum.clone());
        assert!(matches!(&nested, JExpr::Binary { rhs, .. } if matches!(**rhs, JExpr::Paren(_))));

        let chained = JExpr::binary(JBinaryOp::Add, sum, JExpr::name("c"));
        assert!(matches!(&chained, JExpr::Binary { lhs, .. } if matches!(**lhs, JExpr::Binary { .. })));
    }

    #[test]
    fn double_negation_keeps_tokens_apart() {
        let inner = JExpr::unary(JUnaryOp::Neg, JExpr::name("x"));
        let outer = JExpr::unary(JUnaryOp::Neg, inner);
        assert!(matches!(&outer, JExpr::Unary { operand, .. } if matches!(**operand, JExpr::Paren(_))));
    }

    #[test]
    fn only_java_statement_expressions_stand_alone() {
        let x = JExpr::name("x");
        let product = JExpr::binary(JBinaryOp::Mul, x.clone(), JExpr::number("2"));
        assert!(!product.is_statement_expr());
        assert!(!product.has_side_effects());

        let call = JExpr::static_call("Runtime", "lookup", vec![JExpr::string("y")]);
        let sum = JExpr::binary(JBinaryOp::Add, x.clone(), call.clone());
        assert!(!sum.is_statement_expr());
        assert!(sum.has_side_effects());

        assert!(call.is_statement_expr());
        assert!(JExpr::unary(JUnaryOp::PostInc, x.clone()).is_statement_expr());
        assert!(!JExpr::unary(JUnaryOp::Not, x).is_statement_expr());
    }

    #[test]
    fn reachability_of_block_ends() {
        let returns = Block::new(vec![JStmt::Return(Some(JExpr::null()))]);
        let branch = |else_branch| JStmt::If {
            cond: JExpr::name("c"),
            then_block: returns.clone(),
            else_branch,
        };
        assert!(!returns.completes_normally());
        assert!(Block::new(vec![branch(None)]).completes_normally());
        let both = branch(Some(JElse::Block(returns.clone())));
        assert!(!Block::new(vec![both]).completes_normally());

        let forever = |body| JStmt::While {
            cond: JExpr::bool(true),
            body: Block::new(body),
        };
        assert!(!forever(vec![JStmt::Continue]).completes_normally());
        assert!(forever(vec![branch(None), JStmt::Break]).completes_normally());
    }

    #[test]
    fn generic_types_display_with_arguments() {
        let map = JType::generic("Map", vec![JType::string(), JType::object()]);
        assert_eq!(map.to_string(), "Map<String, Object>");
        assert_eq!(JType::Primitive(Primitive::Int).boxed().to_string(), "Integer");
    }
}
