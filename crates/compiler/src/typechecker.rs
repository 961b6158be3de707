//! Type checker and scope resolver for minic
//!
//! One pass over the AST, one function at a time. Function signatures are
//! registered up front so forward references and recursion resolve. Within
//! a function the checker:
//!
//! - assigns every definition a function-unique IR name `<name>_<k>` and
//!   rewrites every reference to the innermost enclosing definition,
//! - infers a type for every expression (write-once), and
//! - inserts cast nodes wherever the promotion hierarchy widens an operand.
//!
//! Parameters share the outermost scope with the function body; every other
//! brace block opens a fresh scope.

use crate::ast::{Block, Expr, ExprKind, FunDef, Literal, LocalVar, SourceFile, Stmt, StmtKind, UnaryOp};
use crate::types::{self, ANY_NUMBER};
use std::collections::HashMap;

/// Format a line number as an error message prefix (e.g., "at line 42: ").
/// Line numbers are 0-indexed internally, so we add 1 for display.
fn line_prefix(line: usize) -> String {
    format!("at line {}: ", line + 1)
}

/// `expr_type` is acceptable where `expected` is required: an unresolved
/// literal fits any basic type, everything else must match exactly.
fn compatible(expr_type: &str, expected: &str) -> bool {
    if expr_type == ANY_NUMBER && types::is_basic(expected) {
        return true;
    }
    expr_type == expected
}

/// Wrap `expr` in a cast toward `expected` when `expected` sits strictly
/// higher in the promotion hierarchy. Types outside the hierarchy
/// (pointers, structs) are left untouched.
fn promote_in_place(expr: &mut Expr, expected: &str) -> Result<(), String> {
    let current = expr.inferred_type()?.to_string();
    if current == expected {
        return Ok(());
    }
    let (Some(current_rank), Some(expected_rank)) = (
        types::promotion_rank(&current),
        types::promotion_rank(expected),
    ) else {
        return Ok(());
    };

    if expected_rank > current_rank {
        let (line, offset) = (expr.line, expr.offset);
        let inner = std::mem::replace(
            expr,
            Expr::new(ExprKind::Literal(Literal::Int(0)), line, offset),
        );
        let mut cast = Expr::new(
            ExprKind::Cast {
                target: expected.to_string(),
                operand: Box::new(inner),
            },
            line,
            offset,
        );
        cast.set_inferred_type(expected.to_string())?;
        *expr = cast;
    }
    Ok(())
}

/// Scoping, definitions, and the expected return type within one function.
struct BlockContext {
    /// Innermost scope last; the outermost scope holds the parameters and
    /// the function body's top-level declarations.
    scopes: Vec<HashMap<String, LocalVar>>,
    /// Per-function counter feeding `<name>_<k>` IR names
    variable_idx: usize,
    return_type: String,
    /// Every definition in definition order, parameters first
    locals: Vec<LocalVar>,
}

impl BlockContext {
    fn new(return_type: String) -> Self {
        BlockContext {
            scopes: vec![HashMap::new()],
            variable_idx: 0,
            return_type,
            locals: Vec::new(),
        }
    }

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// The innermost definition of `name`, walking outward.
    fn lookup(&self, name: &str) -> Option<&LocalVar> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn define(&mut self, name: &str, var_type: &str, line: usize) -> Result<LocalVar, String> {
        let local = LocalVar {
            name: name.to_string(),
            ir_name: format!("{}_{}", name, self.variable_idx),
            var_type: var_type.to_string(),
        };

        let scope = self
            .scopes
            .last_mut()
            .ok_or_else(|| format!("{}no open scope", line_prefix(line)))?;
        if scope.contains_key(name) {
            return Err(format!(
                "{}redefinition of variable '{}' in the same block",
                line_prefix(line),
                name
            ));
        }
        scope.insert(name.to_string(), local.clone());

        self.variable_idx += 1;
        self.locals.push(local.clone());
        Ok(local)
    }
}

pub struct TypeChecker {
    /// Function name -> declared return type
    function_types: HashMap<String, String>,
    /// Function name -> declared parameter types
    function_params: HashMap<String, Vec<String>>,
}

impl TypeChecker {
    pub fn new() -> Self {
        TypeChecker {
            function_types: HashMap::new(),
            function_params: HashMap::new(),
        }
    }

    /// Check every function in the file, mutating the AST in place.
    pub fn check_source_file(&mut self, src: &mut SourceFile) -> Result<(), String> {
        // signatures first, so calls can reference any function in the file
        for fun in &src.fun_defs {
            self.function_types
                .insert(fun.name.clone(), fun.return_type.clone());
            self.function_params.insert(
                fun.name.clone(),
                fun.params.iter().map(|p| p.param_type.clone()).collect(),
            );
        }

        for fun in &mut src.fun_defs {
            self.check_fun_def(fun)?;
        }
        Ok(())
    }

    fn check_fun_def(&mut self, fun: &mut FunDef) -> Result<(), String> {
        let mut ctx = BlockContext::new(fun.return_type.clone());

        // parameters live in the same scope as the body
        for param in &mut fun.params {
            let local = ctx.define(&param.name, &param.param_type, param.line)?;
            param.ir_name = Some(local.ir_name);
        }

        self.check_block(&mut fun.body, &mut ctx, false)?;

        fun.locals = ctx.locals;
        Ok(())
    }

    fn check_block(
        &mut self,
        block: &mut Block,
        ctx: &mut BlockContext,
        new_scope: bool,
    ) -> Result<(), String> {
        if new_scope {
            ctx.push_scope();
        }
        for stmt in &mut block.statements {
            self.check_stmt(stmt, ctx)?;
        }
        if new_scope {
            ctx.pop_scope();
        }
        Ok(())
    }

    fn check_stmt(&mut self, stmt: &mut Stmt, ctx: &mut BlockContext) -> Result<(), String> {
        let line = stmt.line;
        match &mut stmt.kind {
            StmtKind::Return { expr } => {
                self.check_expr(expr, ctx)?;
                promote_in_place(expr, &ctx.return_type)?;
                let ty = expr.inferred_type()?;
                if !compatible(ty, &ctx.return_type) {
                    return Err(format!(
                        "{}return type mismatch: expected '{}', got '{}'",
                        line_prefix(line),
                        ctx.return_type,
                        ty
                    ));
                }
                Ok(())
            }
            StmtKind::Assign {
                left,
                right,
                is_define: true,
                decl_type,
            } => {
                let decl_type = decl_type
                    .clone()
                    .ok_or_else(|| format!("{}declaration without a type", line_prefix(line)))?;

                self.check_expr(right, ctx)?;
                promote_in_place(right, &decl_type)?;
                let right_type = right.inferred_type()?;
                if right_type != decl_type {
                    return Err(format!(
                        "{}cannot initialize '{}' variable '{}' from '{}'",
                        line_prefix(line),
                        decl_type,
                        left,
                        right_type
                    ));
                }

                match &mut left.kind {
                    ExprKind::Var { name, ir_name } => {
                        let local = ctx.define(name, &decl_type, left.line)?;
                        *ir_name = Some(local.ir_name);
                    }
                    _ => {
                        return Err(format!(
                            "{}declaration target must be a variable name",
                            line_prefix(line)
                        ));
                    }
                }
                left.set_inferred_type(decl_type)?;
                Ok(())
            }
            StmtKind::Assign {
                left,
                right,
                is_define: false,
                ..
            } => {
                let is_lvalue = matches!(
                    left.kind,
                    ExprKind::Var { .. }
                        | ExprKind::Unary {
                            op: UnaryOp::Deref,
                            ..
                        }
                );
                if !is_lvalue {
                    return Err(format!(
                        "{}invalid l-value '{}' on the left of assignment",
                        line_prefix(line),
                        left
                    ));
                }

                let left_type = self.check_expr(left, ctx)?;
                self.check_expr(right, ctx)?;
                promote_in_place(right, &left_type)?;
                let right_type = right.inferred_type()?;
                if right_type != left_type {
                    return Err(format!(
                        "{}cannot assign '{}' to '{}' l-value '{}'",
                        line_prefix(line),
                        right_type,
                        left_type,
                        left
                    ));
                }
                Ok(())
            }
            StmtKind::Expr { expr } => {
                self.check_expr(expr, ctx)?;
                Ok(())
            }
            StmtKind::Block(block) => self.check_block(block, ctx, true),
            StmtKind::While { condition, body } => {
                let cond_type = self.check_expr(condition, ctx)?;
                if !types::is_integral(&cond_type) && cond_type != ANY_NUMBER {
                    return Err(format!(
                        "{}while condition must be integral, got '{}'",
                        line_prefix(line),
                        cond_type
                    ));
                }
                self.check_block(body, ctx, true)
            }
            StmtKind::IfElse {
                condition,
                if_body,
                else_body,
            } => {
                let cond_type = self.check_expr(condition, ctx)?;
                if !types::is_integral(&cond_type) && cond_type != ANY_NUMBER {
                    return Err(format!(
                        "{}if condition must be integral, got '{}'",
                        line_prefix(line),
                        cond_type
                    ));
                }
                self.check_block(if_body, ctx, true)?;
                if let Some(else_stmt) = else_body {
                    self.check_stmt(else_stmt, ctx)?;
                }
                Ok(())
            }
        }
    }

    /// Infer and record the type of an expression, resolving variable
    /// references and inserting promotions in binary operands.
    fn check_expr(&mut self, expr: &mut Expr, ctx: &mut BlockContext) -> Result<String, String> {
        let line = expr.line;
        let ty = match &mut expr.kind {
            ExprKind::Literal(_) => ANY_NUMBER.to_string(),

            ExprKind::Var { name, ir_name } => {
                let local = ctx.lookup(name).ok_or_else(|| {
                    format!(
                        "{}referenced variable '{}' not defined",
                        line_prefix(line),
                        name
                    )
                })?;
                let var_type = local.var_type.clone();
                *ir_name = Some(local.ir_name.clone());
                var_type
            }

            ExprKind::FunCall { name, args } => {
                let return_type = self.function_types.get(name.as_str()).cloned().ok_or_else(
                    || {
                        format!(
                            "{}call to undefined function '{}'",
                            line_prefix(line),
                            name
                        )
                    },
                )?;
                let param_types = self
                    .function_params
                    .get(name.as_str())
                    .cloned()
                    .unwrap_or_default();
                if args.len() != param_types.len() {
                    return Err(format!(
                        "{}function '{}' expects {} argument(s), got {}",
                        line_prefix(line),
                        name,
                        param_types.len(),
                        args.len()
                    ));
                }
                let name = name.clone();
                for (index, (arg, param_type)) in
                    args.iter_mut().zip(&param_types).enumerate()
                {
                    let arg_type = self.check_expr(arg, ctx)?;
                    if !compatible(&arg_type, param_type) {
                        return Err(format!(
                            "{}argument {} of '{}' expects '{}', got '{}'",
                            line_prefix(line),
                            index + 1,
                            name,
                            param_type,
                            arg_type
                        ));
                    }
                }
                return_type
            }

            ExprKind::Binary { op, left, right } => {
                let left_type = self.check_expr(left, ctx)?;
                let right_type = self.check_expr(right, ctx)?;

                // promote the lower-ranked side toward the other
                promote_in_place(left, &right_type)?;
                promote_in_place(right, &left_type)?;

                let left_type = left.inferred_type()?.to_string();
                let right_type = right.inferred_type()?;
                if left_type != right_type {
                    return Err(format!(
                        "{}cannot apply '{}' to operands of types '{}' and '{}'",
                        line_prefix(line),
                        op.symbol(),
                        left_type,
                        right_type
                    ));
                }
                left_type
            }

            ExprKind::Unary { op, operand } => {
                let operand_type = self.check_expr(operand, ctx)?;
                match op {
                    UnaryOp::Neg => {
                        if !types::is_basic(&operand_type) && operand_type != ANY_NUMBER {
                            return Err(format!(
                                "{}cannot negate value of type '{}'",
                                line_prefix(line),
                                operand_type
                            ));
                        }
                        operand_type
                    }
                    UnaryOp::Ref => types::pointer_to(&operand_type),
                    UnaryOp::Deref => types::pointee(&operand_type)
                        .ok_or_else(|| {
                            format!(
                                "{}dereference requires a pointer, got '{}'",
                                line_prefix(line),
                                operand_type
                            )
                        })?
                        .to_string(),
                }
            }

            ExprKind::Cast { target, operand } => {
                let target = target.clone();
                self.check_expr(operand, ctx)?;
                target
            }
        };

        expr.set_inferred_type(ty.clone())?;
        Ok(ty)
    }
}

impl Default for TypeChecker {
    fn default() -> Self {
        TypeChecker::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::Parser;

    fn check(source: &str) -> Result<SourceFile, String> {
        let tokens = tokenize(source)?;
        let mut file = Parser::new(tokens, source).parse()?;
        TypeChecker::new().check_source_file(&mut file)?;
        Ok(file)
    }

    fn local_ir_names(fun: &FunDef) -> Vec<&str> {
        fun.locals.iter().map(|l| l.ir_name.as_str()).collect()
    }

    #[test]
    fn test_params_and_locals_numbered_in_definition_order() {
        let file = check("int main(int argc, char **argv) { int a = 0; }").unwrap();
        let fun = &file.fun_defs[0];
        assert_eq!(local_ir_names(fun), vec!["argc_0", "argv_1", "a_2"]);
        assert_eq!(fun.locals[1].var_type, "char**");
    }

    #[test]
    fn test_shadowing_gets_distinct_ir_names() {
        let src = "int f(int n) {\
                     int r = n*f(n-1);\
                     { int redefined = 0; int r = 2; }\
                     return r;\
                   }";
        let file = check(src).unwrap();
        let fun = &file.fun_defs[0];
        assert_eq!(
            local_ir_names(fun),
            vec!["n_0", "r_1", "redefined_2", "r_3"]
        );

        // the trailing `return r;` must resolve to the outer r
        let Some(Stmt {
            kind: StmtKind::Return { expr },
            ..
        }) = fun.body.statements.last()
        else {
            panic!("expected trailing return");
        };
        assert_eq!(expr.ir_name(), Some("r_1"));
    }

    #[test]
    fn test_reference_resolves_to_innermost_definition() {
        let src = "int f() { int a = 1; { int a = 2; a = 3; } a = 4; return a; }";
        let file = check(src).unwrap();
        let body = &file.fun_defs[0].body;

        let StmtKind::Block(inner) = &body.statements[1].kind else {
            panic!("expected inner block");
        };
        let StmtKind::Assign { left, .. } = &inner.statements[1].kind else {
            panic!("expected inner assignment");
        };
        assert_eq!(left.ir_name(), Some("a_1"));

        let StmtKind::Assign { left, .. } = &body.statements[2].kind else {
            panic!("expected outer assignment");
        };
        assert_eq!(left.ir_name(), Some("a_0"));
    }

    #[test]
    fn test_redefinition_in_same_block_is_error() {
        let err = check("int f() { int a = 1; int a = 2; }").unwrap_err();
        assert!(err.contains("redefinition"), "{}", err);
    }

    #[test]
    fn test_undefined_variable_is_error() {
        let err = check("int f() { return ghost; }").unwrap_err();
        assert!(err.contains("'ghost' not defined"), "{}", err);
    }

    #[test]
    fn test_shadowing_in_nested_scope_allowed() {
        check("int f(int n) { { int n = 3; } return n; }").unwrap();
        check("int f(int n) { while (1) { int a = 3; } return 0; }").unwrap();
    }

    #[test]
    fn test_return_promotes_literal_to_float() {
        let file = check("float f() { return 1; }").unwrap();
        let StmtKind::Return { expr } = &file.fun_defs[0].body.statements[0].kind else {
            panic!("expected return");
        };
        match &expr.kind {
            ExprKind::Cast { target, operand } => {
                assert_eq!(target, "float");
                assert_eq!(expr.inferred_type().unwrap(), "float");
                assert!(matches!(operand.kind, ExprKind::Literal(Literal::Int(1))));
            }
            other => panic!("expected inserted cast, got {:?}", other),
        }
    }

    #[test]
    fn test_binary_promotes_lower_ranked_operand() {
        let src = "double f(double d, int i) { return d + i; }";
        let file = check(src).unwrap();
        let StmtKind::Return { expr } = &file.fun_defs[0].body.statements[0].kind else {
            panic!("expected return");
        };
        let ExprKind::Binary { left, right, .. } = &expr.kind else {
            panic!("expected binary add");
        };
        assert_eq!(left.inferred_type().unwrap(), "double");
        match &right.kind {
            ExprKind::Cast { target, .. } => assert_eq!(target, "double"),
            other => panic!("expected promoted right operand, got {:?}", other),
        }
    }

    #[test]
    fn test_pointer_chain_and_cast_assignment() {
        let src = "int main() { int a = 0; int *b = &a; int **c = &b; *&*c = (int*)1; }";
        let file = check(src).unwrap();
        let StmtKind::Assign { left, right, .. } =
            &file.fun_defs[0].body.statements[3].kind
        else {
            panic!("expected assignment");
        };
        assert_eq!(left.inferred_type().unwrap(), "int*");
        match &right.kind {
            ExprKind::Cast { target, .. } => assert_eq!(target, "int*"),
            other => panic!("expected cast on the right, got {:?}", other),
        }
        assert_eq!(right.inferred_type().unwrap(), "int*");
    }

    #[test]
    fn test_deref_of_non_pointer_is_error() {
        let err = check("int f(int n) { return *n; }").unwrap_err();
        assert!(err.contains("requires a pointer"), "{}", err);
    }

    #[test]
    fn test_non_integral_condition_is_error() {
        let err = check("int f(float x) { while (x) { } return 0; }").unwrap_err();
        assert!(err.contains("must be integral"), "{}", err);

        let err = check("int f(int *p) { if (p) { } return 0; }").unwrap_err();
        assert!(err.contains("must be integral"), "{}", err);
    }

    #[test]
    fn test_return_type_mismatch_is_error() {
        let err = check("int f() { return 2.0; }").unwrap_err();
        assert!(err.contains("return type mismatch"), "{}", err);
    }

    #[test]
    fn test_call_checks_argument_count_and_types() {
        let err = check("int f(int a) { return a; } int main() { return f(1, 2); }").unwrap_err();
        assert!(err.contains("expects 1 argument(s), got 2"), "{}", err);

        let err =
            check("int f(int *p) { return 0; } int main() { return f(3); }").unwrap_err();
        assert!(err.contains("argument 1"), "{}", err);
    }

    #[test]
    fn test_call_to_undefined_function_is_error() {
        let err = check("int main() { return missing(); }").unwrap_err();
        assert!(err.contains("undefined function 'missing'"), "{}", err);
    }

    #[test]
    fn test_forward_reference_type_checks() {
        check("int main() { return later(2); } int later(int n) { return n; }").unwrap();
    }

    #[test]
    fn test_invalid_lvalue_is_error() {
        let err = check("int f(int a, int b) { a + b = 3; return 0; }").unwrap_err();
        assert!(err.contains("l-value"), "{}", err);
    }

    #[test]
    fn test_rechecking_a_checked_ast_is_an_error() {
        let source = "int main() { int a = 0; return a; }";
        let tokens = tokenize(source).unwrap();
        let mut file = Parser::new(tokens, source).parse().unwrap();
        TypeChecker::new().check_source_file(&mut file).unwrap();

        let err = TypeChecker::new()
            .check_source_file(&mut file)
            .unwrap_err();
        assert!(err.contains("already type-checked"), "{}", err);
    }
}
