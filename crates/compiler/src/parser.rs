//! Recursive-descent parser for minic
//!
//! Owns the two lookahead tricks the grammar needs: type-name recognition
//! (which decides cast-vs-parenthesized-expression after `(` and
//! declaration-vs-assignment at statement position), and the `*` split
//! between multiplication, dereference, and pointer stars.
//!
//! Every failure carries the current token's line plus a short source
//! excerpt around its offset.

use crate::ast::{
    BinaryOp, Block, Expr, ExprKind, FunDef, FunParam, Literal, SourceFile, Stmt, StmtKind,
    UnaryOp,
};
use crate::lexer::{Token, TokenKind, TokenValue};
use crate::types;

/// Token kinds that may start an expression.
fn starts_expr(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::LiteralDecimal
            | TokenKind::LiteralInteger
            | TokenKind::Identifier
            | TokenKind::LeftParen
            | TokenKind::Minus
            | TokenKind::Ampersand
            | TokenKind::Star
    )
}

pub struct Parser<'a> {
    tokens: Vec<Token>,
    source: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    /// The source buffer is kept alongside the tokens so that parse errors
    /// can quote the code around the failing token.
    pub fn new(tokens: Vec<Token>, source: &'a str) -> Self {
        Parser {
            tokens,
            source,
            pos: 0,
        }
    }

    pub fn parse(&mut self) -> Result<SourceFile, String> {
        let mut fun_defs = Vec::new();
        while !self.is_at_end() {
            fun_defs.push(self.parse_fun_def()?);
        }
        Ok(SourceFile { fun_defs })
    }

    // ------------------------------------------------------------------
    // cursor helpers

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn kind(&self, offset: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| t.kind)
    }

    /// Identifier text at `offset`, if the token there is an identifier.
    fn ident_text(&self, offset: usize) -> Option<&str> {
        self.tokens.get(self.pos + offset)?.ident()
    }

    fn advance(&mut self, count: usize) {
        self.pos += count;
    }

    /// Build a parse error at the current token, quoting nearby source.
    fn fail(&self, msg: &str) -> String {
        let anchor = self.pos.min(self.tokens.len().saturating_sub(1));
        match self.tokens.get(anchor) {
            Some(token) => {
                let start = token.offset.saturating_sub(10);
                let end = (token.offset + 10).min(self.source.len());
                let excerpt = self
                    .source
                    .get(start..end)
                    .unwrap_or("")
                    .replace('\n', " ");
                format!(
                    "at line {}: {}, near '{}'",
                    token.line + 1,
                    msg,
                    excerpt.trim()
                )
            }
            None => format!("{} (empty input)", msg),
        }
    }

    fn expect(&mut self, kind: TokenKind, msg: &str) -> Result<(), String> {
        if self.kind(0) == Some(kind) {
            self.advance(1);
            Ok(())
        } else {
            Err(self.fail(msg))
        }
    }

    /// Line and byte offset of the current token, for tagging nodes.
    fn position(&self) -> (usize, usize) {
        let anchor = self.pos.min(self.tokens.len().saturating_sub(1));
        self.tokens
            .get(anchor)
            .map(|t| (t.line, t.offset))
            .unwrap_or((0, 0))
    }

    // ------------------------------------------------------------------
    // type names

    /// Try to read a type name starting `from` tokens ahead without
    /// consuming anything. Returns the canonical type string and the number
    /// of tokens it spans.
    ///
    /// Only `struct`, `unsigned`, or a basic type word can begin a type
    /// name; this is what keeps casts unambiguous from parenthesized
    /// expressions and declarations unambiguous from expressions.
    fn try_parse_type_name(&self, from: usize) -> Option<(String, usize)> {
        let mut look = from;
        let mut result = String::new();

        match self.kind(look) {
            Some(TokenKind::Struct) => {
                look += 1;
                let name = self.ident_text(look)?;
                result.push_str("struct ");
                result.push_str(name);
                look += 1;
            }
            Some(TokenKind::Unsigned) => {
                look += 1;
                let base = self.ident_text(look)?;
                if !types::is_integral(base) {
                    return None;
                }
                result.push_str("unsigned ");
                result.push_str(base);
                look += 1;
            }
            _ => {
                let base = self.ident_text(look)?;
                if !types::is_basic(base) {
                    return None;
                }
                result.push_str(base);
                look += 1;
            }
        }

        while self.kind(look) == Some(TokenKind::Star) {
            result.push('*');
            look += 1;
        }

        Some((result, look - from))
    }

    // ------------------------------------------------------------------
    // expressions

    /// `(` already seen by the caller's dispatch: either a cast
    /// `( type_name ) unary` or a parenthesized expression `( expr )`.
    fn parse_paren(&mut self) -> Result<Expr, String> {
        let (line, offset) = self.position();
        self.expect(TokenKind::LeftParen, "expected '('")?;

        if let Some((type_name, consumed)) = self.try_parse_type_name(0) {
            if self.kind(consumed) == Some(TokenKind::RightParen) {
                self.advance(consumed + 1);
                let operand = self.parse_unary()?;
                return Ok(Expr::new(
                    ExprKind::Cast {
                        target: type_name,
                        operand: Box::new(operand),
                    },
                    line,
                    offset,
                ));
            }
        }

        let result = self.parse_expr()?;
        self.expect(
            TokenKind::RightParen,
            "expected ')' to close parenthesized expression",
        )?;
        Ok(result)
    }

    fn parse_fun_call(&mut self) -> Result<Expr, String> {
        let (line, offset) = self.position();
        let name = self
            .ident_text(0)
            .ok_or_else(|| self.fail("expected function name"))?
            .to_string();
        self.advance(1);
        self.expect(TokenKind::LeftParen, "expected '(' after function name")?;

        let mut args = Vec::new();
        loop {
            match self.kind(0) {
                Some(TokenKind::RightParen) => break,
                Some(_) => {}
                None => return Err(self.fail("unterminated argument list")),
            }
            args.push(self.parse_expr()?);
            match self.kind(0) {
                Some(TokenKind::Comma) => self.advance(1),
                Some(TokenKind::RightParen) => break,
                _ => return Err(self.fail("expected ',' or ')' in argument list")),
            }
        }
        self.expect(TokenKind::RightParen, "expected ')' to close argument list")?;

        Ok(Expr::new(ExprKind::FunCall { name, args }, line, offset))
    }

    fn parse_var(&mut self) -> Result<Expr, String> {
        let (line, offset) = self.position();
        let name = self
            .ident_text(0)
            .ok_or_else(|| self.fail("expected variable name"))?
            .to_string();
        self.advance(1);
        Ok(Expr::new(
            ExprKind::Var {
                name,
                ir_name: None,
            },
            line,
            offset,
        ))
    }

    fn parse_term(&mut self) -> Result<Expr, String> {
        let (line, offset) = self.position();
        match self.kind(0) {
            Some(TokenKind::LiteralInteger) | Some(TokenKind::LiteralDecimal) => {
                let value = match &self.tokens[self.pos].value {
                    TokenValue::Int(n) => Literal::Int(*n),
                    TokenValue::Float(x) => Literal::Float(*x),
                    TokenValue::Text(_) => return Err(self.fail("malformed literal token")),
                };
                self.advance(1);
                Ok(Expr::new(ExprKind::Literal(value), line, offset))
            }
            Some(TokenKind::Identifier) => {
                if self.kind(1) == Some(TokenKind::LeftParen) {
                    self.parse_fun_call()
                } else {
                    self.parse_var()
                }
            }
            Some(TokenKind::LeftParen) => self.parse_paren(),
            _ => Err(self.fail("expected expression")),
        }
    }

    fn parse_dot(&mut self) -> Result<Expr, String> {
        let (line, offset) = self.position();
        let mut left = self.parse_term()?;

        while self.kind(0) == Some(TokenKind::Dot) {
            self.advance(1);
            if self.kind(0) != Some(TokenKind::Identifier) {
                return Err(self.fail("expected identifier after '.'"));
            }
            let right = self.parse_term()?;
            left = Expr::new(
                ExprKind::Binary {
                    op: BinaryOp::Dot,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                line,
                offset,
            );
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        let (line, offset) = self.position();
        let op = match self.kind(0) {
            Some(TokenKind::Minus) => Some(UnaryOp::Neg),
            Some(TokenKind::Star) => Some(UnaryOp::Deref),
            Some(TokenKind::Ampersand) => Some(UnaryOp::Ref),
            _ => None,
        };

        match op {
            Some(op) => {
                self.advance(1);
                let operand = self.parse_unary()?;
                Ok(Expr::new(
                    ExprKind::Unary {
                        op,
                        operand: Box::new(operand),
                    },
                    line,
                    offset,
                ))
            }
            None => self.parse_dot(),
        }
    }

    /// Left-associative binary tier: parse `operand` once, then fold
    /// `(op operand)*` for any operator found by `match_op`.
    fn parse_binary_tier(
        &mut self,
        operand: fn(&mut Self) -> Result<Expr, String>,
        match_op: fn(TokenKind) -> Option<BinaryOp>,
    ) -> Result<Expr, String> {
        let (line, offset) = self.position();
        let mut left = operand(self)?;

        while let Some(op) = self.kind(0).and_then(match_op) {
            self.advance(1);
            let right = operand(self)?;
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                line,
                offset,
            );
        }

        Ok(left)
    }

    fn parse_mul(&mut self) -> Result<Expr, String> {
        self.parse_binary_tier(Self::parse_unary, |kind| match kind {
            TokenKind::Star => Some(BinaryOp::Mul),
            TokenKind::Slash => Some(BinaryOp::Div),
            _ => None,
        })
    }

    fn parse_add(&mut self) -> Result<Expr, String> {
        self.parse_binary_tier(Self::parse_mul, |kind| match kind {
            TokenKind::Plus => Some(BinaryOp::Add),
            TokenKind::Minus => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn parse_cmp(&mut self) -> Result<Expr, String> {
        self.parse_binary_tier(Self::parse_add, |kind| match kind {
            TokenKind::Equality => Some(BinaryOp::Equality),
            TokenKind::LessThan => Some(BinaryOp::LessThan),
            TokenKind::LessThanEqual => Some(BinaryOp::LessThanEqual),
            TokenKind::GreaterThan => Some(BinaryOp::GreaterThan),
            TokenKind::GreaterThanEqual => Some(BinaryOp::GreaterThanEqual),
            _ => None,
        })
    }

    fn parse_bitwise(&mut self) -> Result<Expr, String> {
        self.parse_binary_tier(Self::parse_cmp, |kind| match kind {
            TokenKind::Pipe => Some(BinaryOp::BitOr),
            TokenKind::Ampersand => Some(BinaryOp::BitAnd),
            _ => None,
        })
    }

    pub fn parse_expr(&mut self) -> Result<Expr, String> {
        self.parse_bitwise()
    }

    // ------------------------------------------------------------------
    // statements

    fn parse_stmt(&mut self) -> Result<Stmt, String> {
        let Some(kind) = self.kind(0) else {
            return Err(self.fail("expected statement"));
        };

        // declaration lookahead: type_name identifier '='
        if let Some((_, consumed)) = self.try_parse_type_name(0) {
            if self.ident_text(consumed).is_some()
                && self.kind(consumed + 1) == Some(TokenKind::Assign)
            {
                return self.parse_stmt_assign(None);
            }
        }

        match kind {
            TokenKind::Return => self.parse_stmt_return(),
            TokenKind::While => self.parse_stmt_while(),
            TokenKind::If => self.parse_stmt_if_else(),
            TokenKind::LeftBrace => {
                let (line, offset) = self.position();
                let block = self.parse_block()?;
                Ok(Stmt {
                    kind: StmtKind::Block(block),
                    line,
                    offset,
                })
            }
            TokenKind::Identifier if self.kind(1) == Some(TokenKind::Assign) => {
                self.parse_stmt_assign(None)
            }
            _ if starts_expr(kind) => {
                let (line, offset) = self.position();
                let expr = self.parse_expr()?;
                if self.kind(0) == Some(TokenKind::Assign) {
                    // l-value was an expression, e.g. `*p = x;`
                    self.parse_stmt_assign(Some(expr))
                } else {
                    self.expect(TokenKind::Semicolon, "expected ';' after expression")?;
                    Ok(Stmt {
                        kind: StmtKind::Expr { expr },
                        line,
                        offset,
                    })
                }
            }
            _ => Err(self.fail("statement cannot start here")),
        }
    }

    fn parse_stmt_return(&mut self) -> Result<Stmt, String> {
        let (line, offset) = self.position();
        self.expect(TokenKind::Return, "expected 'return'")?;

        if !self.kind(0).is_some_and(starts_expr) {
            return Err(self.fail("expected expression after 'return'"));
        }
        let expr = self.parse_expr()?;
        self.expect(TokenKind::Semicolon, "expected ';' after return value")?;

        Ok(Stmt {
            kind: StmtKind::Return { expr },
            line,
            offset,
        })
    }

    /// Declaration (`int a = ...;`) or assignment (`a = ...;`, `*p = ...;`).
    /// `pre_parsed_left` carries an already-parsed l-value expression from
    /// the statement dispatcher.
    fn parse_stmt_assign(&mut self, pre_parsed_left: Option<Expr>) -> Result<Stmt, String> {
        let (line, offset) = self.position();

        if pre_parsed_left.is_none() {
            if let Some((decl_type, consumed)) = self.try_parse_type_name(0) {
                self.advance(consumed);
                let left = self.parse_var()?;
                self.expect(TokenKind::Assign, "expected '=' in declaration")?;
                let right = self.parse_expr()?;
                self.expect(TokenKind::Semicolon, "expected ';' after declaration")?;
                return Ok(Stmt {
                    kind: StmtKind::Assign {
                        left,
                        right,
                        is_define: true,
                        decl_type: Some(decl_type),
                    },
                    line,
                    offset,
                });
            }
        }

        let left = match pre_parsed_left {
            Some(expr) => expr,
            None => self.parse_expr()?,
        };
        self.expect(TokenKind::Assign, "expected '=' in assignment")?;
        let right = self.parse_expr()?;
        self.expect(TokenKind::Semicolon, "expected ';' after assignment")?;

        Ok(Stmt {
            kind: StmtKind::Assign {
                left,
                right,
                is_define: false,
                decl_type: None,
            },
            line,
            offset,
        })
    }

    fn parse_stmt_while(&mut self) -> Result<Stmt, String> {
        let (line, offset) = self.position();
        self.expect(TokenKind::While, "expected 'while'")?;
        self.expect(TokenKind::LeftParen, "expected '(' after 'while'")?;
        let condition = self.parse_expr()?;
        self.expect(TokenKind::RightParen, "expected ')' after while condition")?;
        let body = self.parse_block()?;

        Ok(Stmt {
            kind: StmtKind::While { condition, body },
            line,
            offset,
        })
    }

    fn parse_stmt_if_else(&mut self) -> Result<Stmt, String> {
        let (line, offset) = self.position();
        self.expect(TokenKind::If, "expected 'if'")?;
        self.expect(TokenKind::LeftParen, "expected '(' after 'if'")?;
        let condition = self.parse_expr()?;
        self.expect(TokenKind::RightParen, "expected ')' after if condition")?;
        let if_body = self.parse_block()?;

        let mut else_body = None;
        if self.kind(0) == Some(TokenKind::Else) {
            self.advance(1);
            match self.kind(0) {
                Some(TokenKind::If) => {
                    else_body = Some(Box::new(self.parse_stmt_if_else()?));
                }
                Some(TokenKind::LeftBrace) => {
                    let (else_line, else_offset) = self.position();
                    let block = self.parse_block()?;
                    else_body = Some(Box::new(Stmt {
                        kind: StmtKind::Block(block),
                        line: else_line,
                        offset: else_offset,
                    }));
                }
                _ => return Err(self.fail("expected 'if' or '{' after 'else'")),
            }
        }

        Ok(Stmt {
            kind: StmtKind::IfElse {
                condition,
                if_body,
                else_body,
            },
            line,
            offset,
        })
    }

    fn parse_block(&mut self) -> Result<Block, String> {
        let (line, offset) = self.position();
        self.expect(TokenKind::LeftBrace, "expected '{' to open block")?;

        let mut statements = Vec::new();
        loop {
            match self.kind(0) {
                Some(TokenKind::RightBrace) => break,
                Some(_) => statements.push(self.parse_stmt()?),
                None => return Err(self.fail("expected '}' to close block")),
            }
        }
        self.advance(1);

        Ok(Block {
            statements,
            line,
            offset,
        })
    }

    // ------------------------------------------------------------------
    // functions

    fn parse_fun_def(&mut self) -> Result<FunDef, String> {
        let (line, offset) = self.position();
        let Some((return_type, consumed)) = self.try_parse_type_name(0) else {
            return Err(self.fail("expected return type of function definition"));
        };
        self.advance(consumed);

        let name = self
            .ident_text(0)
            .ok_or_else(|| self.fail("expected function name"))?
            .to_string();
        self.advance(1);
        self.expect(TokenKind::LeftParen, "expected '(' after function name")?;

        let mut params = Vec::new();
        while self.kind(0) != Some(TokenKind::RightParen) {
            let (param_line, param_offset) = self.position();
            let Some((param_type, consumed)) = self.try_parse_type_name(0) else {
                return Err(self.fail("expected parameter type"));
            };
            self.advance(consumed);

            let param_name = self
                .ident_text(0)
                .ok_or_else(|| self.fail("expected parameter name"))?
                .to_string();
            self.advance(1);

            match self.kind(0) {
                Some(TokenKind::Comma) => self.advance(1),
                Some(TokenKind::RightParen) => {}
                _ => return Err(self.fail("expected ',' or ')' in parameter list")),
            }

            params.push(FunParam {
                param_type,
                name: param_name,
                ir_name: None,
                line: param_line,
                offset: param_offset,
            });
        }
        self.expect(TokenKind::RightParen, "expected ')' to close parameter list")?;

        let body = self.parse_block()?;

        Ok(FunDef {
            return_type,
            name,
            params,
            body,
            locals: Vec::new(),
            line,
            offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse(source: &str) -> Result<SourceFile, String> {
        let tokens = tokenize(source).unwrap();
        Parser::new(tokens, source).parse()
    }

    fn parse_one_expr(source: &str) -> Expr {
        let tokens = tokenize(source).unwrap();
        let mut parser = Parser::new(tokens, source);
        parser.parse_expr().unwrap()
    }

    #[test]
    fn test_parse_simple_function() {
        let src = "float my_function(int arg0, int arg1) { int a = 0; a = 1; \
                   while (a == 0) {a = a + 1;} return 2 + ((1+2) * 3) - 1 + arg0 + f(2,3.5); }";
        let file = parse(src).unwrap();
        assert_eq!(file.fun_defs.len(), 1);

        let fun = &file.fun_defs[0];
        assert_eq!(fun.name, "my_function");
        assert_eq!(fun.return_type, "float");
        assert_eq!(fun.params.len(), 2);
        assert_eq!(fun.params[0].param_type, "int");
        assert_eq!(fun.body.statements.len(), 4);
    }

    #[test]
    fn test_precedence_bitwise_below_comparison() {
        // a < b | (b < 100 & a > 0)  =>  (a < b) | ((b < 100) & (a > 0))
        let expr = parse_one_expr("a < b | (b < 100 & a > 0)");
        match expr.kind {
            ExprKind::Binary { op, left, .. } => {
                assert_eq!(op, BinaryOp::BitOr);
                match left.kind {
                    ExprKind::Binary { op, .. } => assert_eq!(op, BinaryOp::LessThan),
                    other => panic!("expected comparison on the left, got {:?}", other),
                }
            }
            other => panic!("expected bitwise or at the root, got {:?}", other),
        }
    }

    #[test]
    fn test_left_associativity() {
        let expr = parse_one_expr("1 - 2 - 3");
        assert_eq!(expr.to_string(), "(1 - 2) - 3");
    }

    #[test]
    fn test_unary_binds_tighter_than_mul() {
        let expr = parse_one_expr("-a * b");
        assert_eq!(expr.to_string(), "(-a) * b");
    }

    #[test]
    fn test_cast_vs_parenthesized_expression() {
        let cast = parse_one_expr("(int*)1");
        match cast.kind {
            ExprKind::Cast { target, .. } => assert_eq!(target, "int*"),
            other => panic!("expected cast, got {:?}", other),
        }

        let paren = parse_one_expr("(x) * 2");
        match paren.kind {
            ExprKind::Binary { op, .. } => assert_eq!(op, BinaryOp::Mul),
            other => panic!("expected multiplication, got {:?}", other),
        }
    }

    #[test]
    fn test_cast_chain_with_pointer_stars() {
        let src = "unsigned char *ab(int a0, float *a1) \
                   { int t0 = *(int *)(unsigned int *)a0*(*a1)*4; return (unsigned char *)t0; }";
        let file = parse(src).unwrap();
        let fun = &file.fun_defs[0];
        assert_eq!(fun.return_type, "unsigned char*");
        assert_eq!(fun.params[1].param_type, "float*");
    }

    #[test]
    fn test_deref_assignment_statement() {
        let file = parse("int main() { int a = 0; *(&a) = 3; }").unwrap();
        let stmts = &file.fun_defs[0].body.statements;
        match &stmts[1].kind {
            StmtKind::Assign {
                left, is_define, ..
            } => {
                assert!(!is_define);
                match &left.kind {
                    ExprKind::Unary { op, .. } => assert_eq!(*op, UnaryOp::Deref),
                    other => panic!("expected deref l-value, got {:?}", other),
                }
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_else_if_chain() {
        let file =
            parse("int main() { if (a) { return 1; } else if (b) { return 2; } else { return 3; } }")
                .unwrap();
        let stmts = &file.fun_defs[0].body.statements;
        match &stmts[0].kind {
            StmtKind::IfElse { else_body, .. } => {
                let else_stmt = else_body.as_ref().expect("else arm");
                match &else_stmt.kind {
                    StmtKind::IfElse { else_body, .. } => {
                        assert!(else_body.is_some(), "inner else arm missing")
                    }
                    other => panic!("expected chained if, got {:?}", other),
                }
            }
            other => panic!("expected if/else, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_block_and_nested_block() {
        let file = parse("int main() { { } { int a = 1; } }").unwrap();
        assert_eq!(file.fun_defs[0].body.statements.len(), 2);
    }

    #[test]
    fn test_missing_semicolon_reports_line() {
        let err = parse("int main() {\n  int a = 0\n  return a;\n}").unwrap_err();
        assert!(
            err.contains("at line 3") || err.contains("at line 2"),
            "error should point near the fault: {}",
            err
        );
    }

    #[test]
    fn test_trailing_garbage_is_an_error() {
        let err = parse("int main() { return 0; } ;").unwrap_err();
        assert!(err.contains("return type"), "{}", err);
    }

    #[test]
    fn test_all_tokens_consumed_for_valid_source() {
        let src = "int f() { return 1; } int g() { return 2; }";
        let tokens = tokenize(src).unwrap();
        let token_count = tokens.len();
        let mut parser = Parser::new(tokens, src);
        let file = parser.parse().unwrap();
        assert_eq!(file.fun_defs.len(), 2);
        assert_eq!(parser.pos, token_count);
    }

    #[test]
    fn test_lex_round_trip_kind_sequence() {
        // re-tokenizing the space-joined token values reproduces the kinds
        let corpus = [
            "int main() { int a = 0; while (a <= 3.5) { a = a + 1; } return a; }",
            "int f(int n){ if(n==0){return 1;} return n*f(n-1);} int main(){ return f(3); }",
            "int main(){ int a=0; int *b=&a; int **c=&b; *&*c=(int*)1; }",
            "unsigned char *ab(int a0, float *a1) { return (unsigned char *)a0; }",
            "float g() { return .95; }",
        ];
        for src in corpus {
            let tokens = tokenize(src).unwrap();
            let joined: Vec<String> = tokens.iter().map(|t| t.value.to_string()).collect();
            let round_tripped = tokenize(&joined.join(" ")).unwrap();
            let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
            let kinds_again: Vec<TokenKind> = round_tripped.iter().map(|t| t.kind).collect();
            assert_eq!(kinds, kinds_again, "round trip failed for: {}", src);
        }
    }
}
