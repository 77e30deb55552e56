//! Java source printer.
//!
//! The canonical layout is what the equivalence oracle compares, so every
//! choice here (brace placement, blank lines, spacing around operators) is
//! fixed. The pretty mode only adds Javadoc on top of it.

use std::fmt::{self, Formatter};

use bx_core::pretty::{escape_string, pretty, PrettyCtx, PrettyOptions, PrettyPrintable};
use itertools::Itertools;

use crate::ast::*;

#[derive(Debug, Clone)]
pub struct JavaPrinter {
    options: PrettyOptions,
}

impl JavaPrinter {
    pub fn new(options: PrettyOptions) -> Self {
        Self { options }
    }

    /// Layout used by the oracle: no comments.
    pub fn canonical() -> Self {
        Self::new(PrettyOptions::canonical())
    }

    /// Canonical layout plus Javadoc.
    pub fn pretty() -> Self {
        Self::new(PrettyOptions::default())
    }

    pub fn options(&self) -> &PrettyOptions {
        &self.options
    }

    pub fn print(&self, unit: &CompilationUnit) -> String {
        pretty(unit, self.options.clone()).to_string()
    }
}

impl Default for JavaPrinter {
    fn default() -> Self {
        Self::canonical()
    }
}

impl PrettyPrintable for CompilationUnit {
    fn fmt_pretty(&self, f: &mut Formatter<'_>, ctx: &mut PrettyCtx<'_>) -> fmt::Result {
        if let Some(package) = &self.package {
            ctx.writeln(f, format!("package {};", package))?;
            writeln!(f)?;
        }
        let imports: Vec<&Import> = self.imports.iter().sorted().dedup().collect();
        if !imports.is_empty() {
            for import in imports {
                if import.is_static {
                    ctx.writeln(f, format!("import static {};", import.path))?;
                } else {
                    ctx.writeln(f, format!("import {};", import.path))?;
                }
            }
            writeln!(f)?;
        }
        for (i, decl) in self.types.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            decl.fmt_pretty(f, ctx)?;
        }
        Ok(())
    }
}

impl PrettyPrintable for TypeDecl {
    fn fmt_pretty(&self, f: &mut Formatter<'_>, ctx: &mut PrettyCtx<'_>) -> fmt::Result {
        write_doc(f, ctx, self.doc.as_deref())?;
        let mut header = format!("{}class {}", modifiers(&self.modifiers), self.name);
        if let Some(extends) = &self.extends {
            header.push_str(&format!(" extends {}", extends));
        }
        if !self.implements.is_empty() {
            header.push_str(&format!(" implements {}", self.implements.iter().join(", ")));
        }
        header.push_str(" {");
        ctx.writeln(f, header)?;
        ctx.with_indent(|ctx| {
            for member in &self.members {
                writeln!(f)?;
                member.fmt_pretty(f, ctx)?;
            }
            Ok(())
        })?;
        ctx.writeln(f, "}")
    }
}

impl PrettyPrintable for Member {
    fn fmt_pretty(&self, f: &mut Formatter<'_>, ctx: &mut PrettyCtx<'_>) -> fmt::Result {
        match self {
            Member::Field(field) => {
                write_doc(f, ctx, field.doc.as_deref())?;
                let mut line = format!("{}{} {}", modifiers(&field.modifiers), field.ty, field.name);
                if let Some(init) = &field.init {
                    line.push_str(&format!(" = {}", expr(init)));
                }
                line.push(';');
                ctx.writeln(f, line)
            }
            Member::Constructor(ctor) => {
                write_doc(f, ctx, ctor.doc.as_deref())?;
                let header = format!(
                    "{}{}({}) {{",
                    modifiers(&ctor.modifiers),
                    ctor.name,
                    params(&ctor.params)
                );
                ctx.writeln(f, header)?;
                block_body(f, ctx, &ctor.body)?;
                ctx.writeln(f, "}")
            }
            Member::Method(method) => {
                write_doc(f, ctx, method.doc.as_deref())?;
                let header = format!(
                    "{}{} {}({}) {{",
                    modifiers(&method.modifiers),
                    method.return_type,
                    method.name,
                    params(&method.params)
                );
                ctx.writeln(f, header)?;
                block_body(f, ctx, &method.body)?;
                ctx.writeln(f, "}")
            }
        }
    }
}

impl PrettyPrintable for JStmt {
    fn fmt_pretty(&self, f: &mut Formatter<'_>, ctx: &mut PrettyCtx<'_>) -> fmt::Result {
        match self {
            JStmt::Local { ty, name, init } => match init {
                Some(init) => ctx.writeln(f, format!("{} {} = {};", ty, name, expr(init))),
                None => ctx.writeln(f, format!("{} {};", ty, name)),
            },
            JStmt::Expr(e) => ctx.writeln(f, format!("{};", expr(e))),
            JStmt::If {
                cond,
                then_block,
                else_branch,
            } => {
                ctx.writeln(f, format!("if ({}) {{", expr(cond)))?;
                block_body(f, ctx, then_block)?;
                let mut next = else_branch.as_ref();
                while let Some(branch) = next {
                    match branch {
                        JElse::If(stmt) => match stmt.as_ref() {
                            JStmt::If {
                                cond,
                                then_block,
                                else_branch,
                            } => {
                                ctx.writeln(f, format!("}} else if ({}) {{", expr(cond)))?;
                                block_body(f, ctx, then_block)?;
                                next = else_branch.as_ref();
                            }
                            other => {
                                ctx.writeln(f, "} else {")?;
                                ctx.with_indent(|ctx| other.fmt_pretty(f, ctx))?;
                                next = None;
                            }
                        },
                        JElse::Block(block) => {
                            ctx.writeln(f, "} else {")?;
                            block_body(f, ctx, block)?;
                            next = None;
                        }
                    }
                }
                ctx.writeln(f, "}")
            }
            JStmt::While { cond, body } => {
                ctx.writeln(f, format!("while ({}) {{", expr(cond)))?;
                block_body(f, ctx, body)?;
                ctx.writeln(f, "}")
            }
            JStmt::DoWhile { body, cond } => {
                ctx.writeln(f, "do {")?;
                block_body(f, ctx, body)?;
                ctx.writeln(f, format!("}} while ({});", expr(cond)))
            }
            JStmt::For {
                init,
                cond,
                update,
                body,
            } => {
                let mut header = String::from("for (");
                match init {
                    Some(JForInit::Local { ty, name, init }) => {
                        header.push_str(&format!("{} {} = {}", ty, name, expr(init)))
                    }
                    Some(JForInit::Exprs(exprs)) => {
                        header.push_str(&exprs.iter().map(expr).join(", "))
                    }
                    None => {}
                }
                header.push(';');
                if let Some(cond) = cond {
                    header.push_str(&format!(" {}", expr(cond)));
                }
                header.push(';');
                if !update.is_empty() {
                    header.push_str(&format!(" {}", update.iter().map(expr).join(", ")));
                }
                header.push_str(") {");
                ctx.writeln(f, header)?;
                block_body(f, ctx, body)?;
                ctx.writeln(f, "}")
            }
            JStmt::ForEach {
                ty,
                name,
                iterable,
                body,
            } => {
                ctx.writeln(f, format!("for ({} {} : {}) {{", ty, name, expr(iterable)))?;
                block_body(f, ctx, body)?;
                ctx.writeln(f, "}")
            }
            JStmt::Switch { subject, cases } => {
                ctx.writeln(f, format!("switch ({}) {{", expr(subject)))?;
                ctx.with_indent(|ctx| {
                    for case in cases {
                        if case.labels.is_empty() {
                            ctx.writeln(f, "default:")?;
                        }
                        for label in &case.labels {
                            ctx.writeln(f, format!("case {}:", expr(label)))?;
                        }
                        ctx.with_indent(|ctx| {
                            for stmt in &case.body {
                                stmt.fmt_pretty(f, ctx)?;
                            }
                            Ok(())
                        })?;
                    }
                    Ok(())
                })?;
                ctx.writeln(f, "}")
            }
            JStmt::Try {
                body,
                catches,
                finally,
            } => {
                ctx.writeln(f, "try {")?;
                block_body(f, ctx, body)?;
                for catch in catches {
                    ctx.writeln(f, format!("}} catch ({} {}) {{", catch.ty, catch.name))?;
                    block_body(f, ctx, &catch.body)?;
                }
                if let Some(finally) = finally {
                    ctx.writeln(f, "} finally {")?;
                    block_body(f, ctx, finally)?;
                }
                ctx.writeln(f, "}")
            }
            JStmt::Throw(e) => ctx.writeln(f, format!("throw {};", expr(e))),
            JStmt::Return(Some(e)) => ctx.writeln(f, format!("return {};", expr(e))),
            JStmt::Return(None) => ctx.writeln(f, "return;"),
            JStmt::Break => ctx.writeln(f, "break;"),
            JStmt::Continue => ctx.writeln(f, "continue;"),
            JStmt::Block(block) => {
                ctx.writeln(f, "{")?;
                block_body(f, ctx, block)?;
                ctx.writeln(f, "}")
            }
        }
    }
}

fn block_body(f: &mut Formatter<'_>, ctx: &mut PrettyCtx<'_>, block: &Block) -> fmt::Result {
    ctx.with_indent(|ctx| {
        for stmt in &block.stmts {
            stmt.fmt_pretty(f, ctx)?;
        }
        Ok(())
    })
}

fn write_doc(f: &mut Formatter<'_>, ctx: &mut PrettyCtx<'_>, doc: Option<&str>) -> fmt::Result {
    let Some(doc) = doc else {
        return Ok(());
    };
    if !ctx.options.show_comments {
        return Ok(());
    }
    ctx.writeln(f, "/**")?;
    for line in doc.lines() {
        let line = line.trim();
        if line.is_empty() {
            ctx.writeln(f, " *")?;
        } else {
            ctx.writeln(f, format!(" * {}", line))?;
        }
    }
    ctx.writeln(f, " */")
}

fn modifiers(modifiers: &[Modifier]) -> String {
    modifiers.iter().map(|m| format!("{} ", m)).collect()
}

fn params(params: &[Param]) -> String {
    params
        .iter()
        .map(|param| format!("{} {}", param.ty, param.name))
        .join(", ")
}

/// Renders one expression on a single line.
pub fn expr(e: &JExpr) -> String {
    match e {
        JExpr::Literal(literal) => literal_text(literal),
        JExpr::Name(name) => name.clone(),
        JExpr::This => "this".to_string(),
        JExpr::FieldAccess { target, name } => format!("{}.{}", expr(target), name),
        JExpr::MethodCall { target, name, args } => match target {
            Some(target) => format!("{}.{}({})", expr(target), name, arguments(args)),
            None => format!("{}({})", name, arguments(args)),
        },
        JExpr::New { ty, args } => format!("new {}({})", ty, arguments(args)),
        JExpr::Binary { op, lhs, rhs } => format!("{} {} {}", expr(lhs), op, expr(rhs)),
        JExpr::Unary { op, operand } if op.is_postfix() => {
            format!("{}{}", expr(operand), op.symbol())
        }
        JExpr::Unary { op, operand } => format!("{}{}", op.symbol(), expr(operand)),
        JExpr::Assign { op, target, value } => {
            format!("{} {} {}", expr(target), op, expr(value))
        }
        JExpr::Conditional {
            cond,
            then_expr,
            else_expr,
        } => format!("{} ? {} : {}", expr(cond), expr(then_expr), expr(else_expr)),
        JExpr::Cast { ty, expr: inner } => format!("({}) {}", ty, expr(inner)),
        JExpr::Paren(inner) => format!("({})", expr(inner)),
        JExpr::Lambda { params: lambda_params, body } => {
            let body = pretty(&LambdaBody(body), PrettyOptions::canonical()).to_string();
            format!("({}) -> {{\n{}}}", params(lambda_params), body)
        }
    }
}

/// Statements of a lambda body, rendered one level in from column zero.
/// The enclosing statement's indent is added when that line is written.
struct LambdaBody<'a>(&'a Block);

impl PrettyPrintable for LambdaBody<'_> {
    fn fmt_pretty(&self, f: &mut Formatter<'_>, ctx: &mut PrettyCtx<'_>) -> fmt::Result {
        block_body(f, ctx, self.0)
    }
}

fn arguments(args: &[JExpr]) -> String {
    args.iter().map(expr).join(", ")
}

fn literal_text(literal: &JLiteral) -> String {
    match literal {
        JLiteral::Null => "null".to_string(),
        JLiteral::Bool(value) => value.to_string(),
        JLiteral::Number(text) => text.clone(),
        JLiteral::String(text) => format!("\"{}\"", escape_string(text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn class_with(members: Vec<Member>) -> CompilationUnit {
        let mut decl = TypeDecl::class("Sample");
        decl.members = members;
        CompilationUnit {
            package: None,
            imports: Vec::new(),
            types: vec![decl],
        }
    }

    fn method(body: Vec<JStmt>) -> Member {
        Member::Method(MethodDecl {
            doc: None,
            modifiers: vec![Modifier::Public],
            return_type: JType::Void,
            name: "run".to_string(),
            params: Vec::new(),
            body: Block::new(body),
        })
    }

    #[test]
    fn empty_class_has_no_blank_lines() {
        let unit = class_with(Vec::new());
        assert_eq!(JavaPrinter::canonical().print(&unit), "public class Sample {\n}\n");
    }

    #[test]
    fn else_if_chains_share_braces() {
        let inner = JStmt::If {
            cond: JExpr::name("b"),
            then_block: Block::new(vec![JStmt::Break]),
            else_branch: Some(JElse::Block(Block::new(vec![JStmt::Continue]))),
        };
        let outer = JStmt::If {
            cond: JExpr::name("a"),
            then_block: Block::default(),
            else_branch: Some(JElse::If(Box::new(inner))),
        };
        let printed = JavaPrinter::canonical().print(&class_with(vec![method(vec![outer])]));
        assert_eq!(
            printed,
            "public class Sample {\n\
             \n    public void run() {\n        if (a) {\n        } else if (b) {\n            break;\n        } else {\n            continue;\n        }\n    }\n}\n"
        );
    }

    #[test]
    fn switch_labels_and_bodies_are_indented() {
        let switch = JStmt::Switch {
            subject: JExpr::name("x"),
            cases: vec![
                JSwitchCase {
                    labels: vec![JExpr::number("1"), JExpr::number("2")],
                    body: vec![JStmt::Break],
                },
                JSwitchCase {
                    labels: Vec::new(),
                    body: vec![JStmt::Return(None)],
                },
            ],
        };
        let printed = JavaPrinter::canonical().print(&class_with(vec![method(vec![switch])]));
        let expected = [
            "public class Sample {",
            "",
            "    public void run() {",
            "        switch (x) {",
            "            case 1:",
            "            case 2:",
            "                break;",
            "            default:",
            "                return;",
            "        }",
            "    }",
            "}",
            "",
        ]
        .join("\n");
        assert_eq!(printed, expected);
    }

    #[test]
    fn javadoc_only_in_pretty_mode() {
        let mut unit = class_with(Vec::new());
        unit.types[0].doc = Some("A sample.".to_string());
        assert_eq!(JavaPrinter::canonical().print(&unit), "public class Sample {\n}\n");
        assert_eq!(
            JavaPrinter::pretty().print(&unit),
            "/**\n * A sample.\n */\npublic class Sample {\n}\n"
        );
    }

    #[test]
    fn expressions_render_with_inserted_parens() {
        let sum = JExpr::binary(JBinaryOp::Add, JExpr::name("a"), JExpr::name("b"));
        let product = JExpr::binary(JBinaryOp::Mul, sum, JExpr::name("c"));
        assert_eq!(expr(&product), "(a + b) * c");

        let neg = JExpr::unary(JUnaryOp::Neg, JExpr::unary(JUnaryOp::Neg, JExpr::name("x")));
        assert_eq!(expr(&neg), "-(-x)");

        let call = JExpr::static_call("Math", "pow", vec![JExpr::name("a"), JExpr::number("2")]);
        assert_eq!(expr(&call), "Math.pow(a, 2)");

        let text = JExpr::string("say \"hi\"\n");
        assert_eq!(expr(&text), "\"say \\\"hi\\\"\\n\"");
    }

    #[test]
    fn lambda_bodies_follow_the_enclosing_indent() {
        let lambda = JExpr::lambda(
            vec![Param::new(JType::object(), "a")],
            Block::new(vec![JStmt::Return(Some(JExpr::name("a")))]),
        );
        let local = JStmt::Local {
            ty: JType::object(),
            name: "f".to_string(),
            init: Some(JExpr::static_call("Runtime", "closure", vec![lambda])),
        };
        let printed = JavaPrinter::canonical().print(&class_with(vec![method(vec![local])]));
        let expected = [
            "public class Sample {",
            "",
            "    public void run() {",
            "        Object f = Runtime.closure((Object a) -> {",
            "            return a;",
            "        });",
            "    }",
            "}",
            "",
        ]
        .join("\n");
        assert_eq!(printed, expected);
    }

    #[test]
    fn for_header_omits_missing_parts() {
        let forever = JStmt::For {
            init: None,
            cond: None,
            update: Vec::new(),
            body: Block::default(),
        };
        let counted = JStmt::For {
            init: Some(JForInit::Local {
                ty: JType::Primitive(Primitive::Int),
                name: "i".to_string(),
                init: JExpr::number("0"),
            }),
            cond: Some(JExpr::binary(JBinaryOp::Lt, JExpr::name("i"), JExpr::number("3"))),
            update: vec![JExpr::unary(JUnaryOp::PostInc, JExpr::name("i"))],
            body: Block::default(),
        };
        let printed = JavaPrinter::canonical().print(&class_with(vec![method(vec![forever, counted])]));
        assert!(printed.contains("        for (;;) {\n        }\n"));
        assert!(printed.contains("        for (int i = 0; i < 3; i++) {\n        }\n"));
    }
}
