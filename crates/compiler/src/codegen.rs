//! x86-64 code generation (System V AMD64, GNU assembler flavor)
//!
//! Lowers a checked AST straight to an instruction list rendered as
//! destination-first assembly text. No register allocation: every local
//! lives in an 8-byte stack slot off `rbp`, and intermediate values flow
//! through the single callee-saved scratch register `rbx` (or through
//! fresh virtual registers `t<n>` when virtual-register mode is on, for
//! readable listings).
//!
//! The one discipline the emitter must never break: the GNU assembler
//! accepts at most one memory operand per instruction, so memory-to-memory
//! transfers stage through the scratch register.

use crate::ast::{
    BinaryOp, Block, Expr, ExprKind, FunDef, Literal, SourceFile, Stmt, StmtKind, UnaryOp,
};
use crate::config::CompilerConfig;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;

/// A physical register, or a numbered virtual one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
    Rax,
    Rbx,
    Rcx,
    Rdx,
    Rsi,
    Rdi,
    Rsp,
    Rbp,
    R8,
    R9,
    Virt(usize),
}

/// System V integer argument registers, in order.
const ARG_REGS: [Reg; 6] = [Reg::Rdi, Reg::Rsi, Reg::Rdx, Reg::Rcx, Reg::R8, Reg::R9];

impl Reg {
    /// The 1-byte view of this register, as used by `setCC`.
    fn low_byte(&self) -> String {
        match self {
            Reg::Rax => "al".to_string(),
            Reg::Rbx => "bl".to_string(),
            Reg::Rcx => "cl".to_string(),
            Reg::Rdx => "dl".to_string(),
            Reg::Rsi => "sil".to_string(),
            Reg::Rdi => "dil".to_string(),
            Reg::R8 => "r8b".to_string(),
            Reg::R9 => "r9b".to_string(),
            Reg::Rsp => "spl".to_string(),
            Reg::Rbp => "bpl".to_string(),
            Reg::Virt(n) => format!("t{}", n),
        }
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reg::Rax => write!(f, "rax"),
            Reg::Rbx => write!(f, "rbx"),
            Reg::Rcx => write!(f, "rcx"),
            Reg::Rdx => write!(f, "rdx"),
            Reg::Rsi => write!(f, "rsi"),
            Reg::Rdi => write!(f, "rdi"),
            Reg::Rsp => write!(f, "rsp"),
            Reg::Rbp => write!(f, "rbp"),
            Reg::R8 => write!(f, "r8"),
            Reg::R9 => write!(f, "r9"),
            Reg::Virt(n) => write!(f, "t{}", n),
        }
    }
}

/// Base of a memory operand: a register or an absolute address.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MemBase {
    Reg(Reg),
    Abs(i64),
}

impl fmt::Display for MemBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemBase::Reg(reg) => write!(f, "{}", reg),
            MemBase::Abs(addr) => write!(f, "{}", addr),
        }
    }
}

/// One 8-byte memory operand `[base +/- offset]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemLoc {
    pub base: MemBase,
    pub offset: i64,
}

impl MemLoc {
    fn at(base: Reg, offset: i64) -> Self {
        MemLoc {
            base: MemBase::Reg(base),
            offset,
        }
    }

    /// Bracket form without the size prefix, shared with `lea` rendering.
    fn bracket(&self) -> String {
        if self.offset > 0 {
            format!("[{} + {}]", self.base, self.offset)
        } else if self.offset < 0 {
            format!("[{} - {}]", self.base, -self.offset)
        } else {
            format!("[{}]", self.base)
        }
    }
}

impl fmt::Display for MemLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QWORD PTR {}", self.bracket())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Imm(Literal),
    Reg(Reg),
    Mem(MemLoc),
}

impl Operand {
    fn is_mem(&self) -> bool {
        matches!(self, Operand::Mem(_))
    }

    fn is_imm(&self) -> bool {
        matches!(self, Operand::Imm(_))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Imm(value) => write!(f, "{}", value),
            Operand::Reg(reg) => write!(f, "{}", reg),
            Operand::Mem(mem) => write!(f, "{}", mem),
        }
    }
}

/// Condition codes produced by comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cc {
    E,
    L,
    Le,
    G,
    Ge,
}

impl Cc {
    fn suffix(&self) -> &'static str {
        match self {
            Cc::E => "e",
            Cc::L => "l",
            Cc::Le => "le",
            Cc::G => "g",
            Cc::Ge => "ge",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluMnemonic {
    Add,
    Sub,
    Imul,
    And,
    Or,
    Cmp,
}

impl AluMnemonic {
    fn mnemonic(&self) -> &'static str {
        match self {
            AluMnemonic::Add => "add",
            AluMnemonic::Sub => "sub",
            AluMnemonic::Imul => "imul",
            AluMnemonic::And => "and",
            AluMnemonic::Or => "or",
            AluMnemonic::Cmp => "cmp",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Mov {
        dest: Operand,
        src: Operand,
    },
    /// `set<cc>` into the low byte of `dest`
    SetCc {
        cc: Cc,
        dest: Reg,
    },
    /// Zero-extend the low byte of `src` into `dest`
    Movzx {
        dest: Reg,
        src: Reg,
    },
    Jmp {
        target: String,
    },
    Je {
        target: String,
    },
    Jne {
        target: String,
    },
    Call {
        target: String,
    },
    Ret,
    Leave,
    Cqo,
    Idiv {
        divisor: Operand,
    },
    Push {
        val: Operand,
    },
    Pop {
        dest: Operand,
    },
    Alu {
        op: AluMnemonic,
        dest: Operand,
        src: Operand,
    },
    Lea {
        dest: Reg,
        loc: MemLoc,
        /// Optional scaled index `stride*reg`
        index: Option<(i64, Reg)>,
    },
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Mov { dest, src } => write!(f, "mov {}, {}", dest, src),
            Instruction::SetCc { cc, dest } => write!(f, "set{} {}", cc.suffix(), dest.low_byte()),
            Instruction::Movzx { dest, src } => write!(f, "movzx {}, {}", dest, src.low_byte()),
            Instruction::Jmp { target } => write!(f, "jmp {}", target),
            Instruction::Je { target } => write!(f, "je {}", target),
            Instruction::Jne { target } => write!(f, "jne {}", target),
            Instruction::Call { target } => write!(f, "call {}", target),
            Instruction::Ret => write!(f, "ret"),
            Instruction::Leave => write!(f, "leave"),
            Instruction::Cqo => write!(f, "cqo"),
            Instruction::Idiv { divisor } => write!(f, "idiv {}", divisor),
            Instruction::Push { val } => write!(f, "push {}", val),
            Instruction::Pop { dest } => write!(f, "pop {}", dest),
            Instruction::Alu { op, dest, src } => {
                write!(f, "{} {}, {}", op.mnemonic(), dest, src)
            }
            Instruction::Lea { dest, loc, index } => match index {
                Some((stride, index_reg)) => {
                    let offset_sign = if loc.offset >= 0 { '+' } else { '-' };
                    write!(
                        f,
                        "lea {}, [{} + {}*{} {} {}]",
                        dest,
                        loc.base,
                        stride,
                        index_reg,
                        offset_sign,
                        loc.offset.abs()
                    )
                }
                None => write!(f, "lea {}, {}", dest, loc.bracket()),
            },
        }
    }
}

pub struct CodeGen {
    use_virtual_registers: bool,
    instructions: Vec<Instruction>,
    /// Label -> instruction index, in insertion (= target) order
    labels: IndexMap<String, usize>,
    label_idx: usize,
    temp_idx: usize,
    /// ir_name -> stack slot, for the function currently being lowered
    var_locations: HashMap<String, MemLoc>,
    epilogue_label: String,
}

impl CodeGen {
    pub fn new(config: &CompilerConfig) -> Self {
        CodeGen {
            use_virtual_registers: config.use_virtual_registers,
            instructions: Vec::new(),
            labels: IndexMap::new(),
            label_idx: 0,
            temp_idx: 0,
            var_locations: HashMap::new(),
            epilogue_label: String::new(),
        }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn label_table(&self) -> &IndexMap<String, usize> {
        &self.labels
    }

    /// Render the labelled, tab-indented GAS listing.
    pub fn render(&self) -> String {
        let targets: Vec<(&str, usize)> = self
            .labels
            .iter()
            .map(|(name, idx)| (name.as_str(), *idx))
            .collect();
        let mut next_label = 0;
        let mut lines = Vec::new();

        for (i, instruction) in self.instructions.iter().enumerate() {
            while next_label < targets.len() && targets[next_label].1 == i {
                lines.push(format!("{}:", targets[next_label].0));
                next_label += 1;
            }
            lines.push(format!("\t{}", instruction));
        }
        while next_label < targets.len() {
            lines.push(format!("{}:", targets[next_label].0));
            next_label += 1;
        }

        lines.join("\n")
    }

    // ------------------------------------------------------------------
    // emission helpers

    fn emit(&mut self, instruction: Instruction) {
        // a mov onto itself carries no information
        if let Instruction::Mov { dest, src } = &instruction {
            if dest == src {
                return;
            }
        }
        self.instructions.push(instruction);
    }

    fn next_label(&mut self, line: usize) -> String {
        let label = format!(".L{}_{}", self.label_idx, line);
        self.label_idx += 1;
        label
    }

    fn insert_label(&mut self, label: String) {
        self.labels.insert(label, self.instructions.len());
    }

    /// The staging register: always `rbx`, or a fresh virtual register in
    /// virtual-register mode.
    fn scratch(&mut self) -> Reg {
        if self.use_virtual_registers {
            let reg = Reg::Virt(self.temp_idx);
            self.temp_idx += 1;
            reg
        } else {
            Reg::Rbx
        }
    }

    fn var_location(&self, expr: &Expr) -> Result<MemLoc, String> {
        let ir_name = expr
            .ir_name()
            .ok_or_else(|| format!("internal error: unresolved variable '{}'", expr))?;
        self.var_locations.get(ir_name).copied().ok_or_else(|| {
            format!("internal error: variable '{}' has no stack slot", ir_name)
        })
    }

    /// Stage `operand` into the scratch register unless it already is a
    /// register.
    fn stage(&mut self, operand: Operand) -> Reg {
        if let Operand::Reg(reg) = operand {
            return reg;
        }
        let reg = self.scratch();
        self.emit(Instruction::Mov {
            dest: Operand::Reg(reg),
            src: operand,
        });
        reg
    }

    // ------------------------------------------------------------------
    // functions

    pub fn lower_source_file(&mut self, src: &SourceFile) -> Result<(), String> {
        for fun in &src.fun_defs {
            self.lower_fun_def(fun)?;
        }
        Ok(())
    }

    fn lower_fun_def(&mut self, fun: &FunDef) -> Result<(), String> {
        self.var_locations.clear();
        self.insert_label(fun.name.clone());
        self.epilogue_label = self.next_label(fun.line);

        self.emit(Instruction::Push {
            val: Operand::Reg(Reg::Rbp),
        });
        self.emit(Instruction::Mov {
            dest: Operand::Reg(Reg::Rbp),
            src: Operand::Reg(Reg::Rsp),
        });

        // rbx is callee-saved; slot 1 below rbp holds it
        let rbx_save = MemLoc::at(Reg::Rbp, -8);
        self.emit(Instruction::Mov {
            dest: Operand::Mem(rbx_save),
            src: Operand::Reg(Reg::Rbx),
        });

        // coarse allocation, two slots per local
        self.emit(Instruction::Alu {
            op: AluMnemonic::Sub,
            dest: Operand::Reg(Reg::Rsp),
            src: Operand::Imm(Literal::Int(16 * fun.locals.len() as i64)),
        });

        // parameters land in the first slots after the rbx save
        for (idx, param) in fun.params.iter().enumerate() {
            let slot = MemLoc::at(Reg::Rbp, -((idx as i64 + 1) * 8) - 8);
            if idx < ARG_REGS.len() {
                self.emit(Instruction::Mov {
                    dest: Operand::Mem(slot),
                    src: Operand::Reg(ARG_REGS[idx]),
                });
            } else {
                // spilled argument: below the return address in the
                // caller's frame, staged through scratch to keep movs at
                // one memory operand
                let incoming = MemLoc::at(Reg::Rbp, 16 + (idx - ARG_REGS.len()) as i64 * 8);
                let staged = self.stage(Operand::Mem(incoming));
                self.emit(Instruction::Mov {
                    dest: Operand::Mem(slot),
                    src: Operand::Reg(staged),
                });
            }

            let ir_name = param
                .ir_name
                .as_deref()
                .ok_or_else(|| format!("internal error: unresolved parameter '{}'", param.name))?;
            self.var_locations.insert(ir_name.to_string(), slot);
        }

        // remaining locals continue the slot sequence after the parameters
        for (idx, local) in fun.locals.iter().enumerate() {
            if self.var_locations.contains_key(&local.ir_name) {
                continue;
            }
            let slot = MemLoc::at(Reg::Rbp, -((idx as i64 + 1) * 8) - 8);
            self.var_locations.insert(local.ir_name.clone(), slot);
        }

        self.lower_block(&fun.body)?;

        let epilogue = self.epilogue_label.clone();
        self.insert_label(epilogue);
        self.emit(Instruction::Mov {
            dest: Operand::Reg(Reg::Rbx),
            src: Operand::Mem(rbx_save),
        });
        self.emit(Instruction::Leave);
        self.emit(Instruction::Ret);
        Ok(())
    }

    fn lower_block(&mut self, block: &Block) -> Result<(), String> {
        for stmt in &block.statements {
            self.lower_stmt(stmt)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // statements

    fn lower_stmt(&mut self, stmt: &Stmt) -> Result<(), String> {
        match &stmt.kind {
            StmtKind::Assign { left, right, .. } => self.lower_assign(left, right),

            StmtKind::Return { expr } => {
                let value = self.lower_expr(expr)?;
                self.emit(Instruction::Mov {
                    dest: Operand::Reg(Reg::Rax),
                    src: value,
                });
                self.emit(Instruction::Jmp {
                    target: self.epilogue_label.clone(),
                });
                Ok(())
            }

            StmtKind::Expr { expr } => {
                self.lower_expr(expr)?;
                Ok(())
            }

            StmtKind::Block(block) => self.lower_block(block),

            StmtKind::While { condition, body } => {
                let body_label = self.next_label(condition.line);
                let test_label = self.next_label(condition.line);

                // test before the first iteration
                self.emit(Instruction::Jmp {
                    target: test_label.clone(),
                });
                self.insert_label(body_label.clone());
                self.lower_block(body)?;

                self.insert_label(test_label);
                self.lower_condition_test(condition)?;
                self.emit(Instruction::Jne { target: body_label });
                Ok(())
            }

            StmtKind::IfElse {
                condition,
                if_body,
                else_body,
            } => {
                self.lower_condition_test(condition)?;
                match else_body {
                    Some(else_stmt) => {
                        let else_label = self.next_label(else_stmt.line);
                        let end_label = self.next_label(stmt.line);

                        self.emit(Instruction::Je {
                            target: else_label.clone(),
                        });
                        self.lower_block(if_body)?;
                        self.emit(Instruction::Jmp {
                            target: end_label.clone(),
                        });

                        self.insert_label(else_label);
                        self.lower_stmt(else_stmt)?;
                        self.insert_label(end_label);
                    }
                    None => {
                        let end_label = self.next_label(stmt.line);
                        self.emit(Instruction::Je {
                            target: end_label.clone(),
                        });
                        self.lower_block(if_body)?;
                        self.insert_label(end_label);
                    }
                }
                Ok(())
            }
        }
    }

    /// Evaluate a branch condition and emit `cmp <cond>, 0`. Immediates
    /// are staged first since `cmp` cannot take one as its destination
    /// operand.
    fn lower_condition_test(&mut self, condition: &Expr) -> Result<(), String> {
        let mut cond = self.lower_expr(condition)?;
        if cond.is_imm() {
            cond = Operand::Reg(self.stage(cond));
        }
        self.emit(Instruction::Alu {
            op: AluMnemonic::Cmp,
            dest: cond,
            src: Operand::Imm(Literal::Int(0)),
        });
        Ok(())
    }

    fn lower_assign(&mut self, left: &Expr, right: &Expr) -> Result<(), String> {
        let value = self.lower_expr(right)?;

        match &left.kind {
            ExprKind::Var { .. } => {
                let slot = self.var_location(left)?;
                // never two memory operands in one mov
                let value = if value.is_mem() {
                    Operand::Reg(self.stage(value))
                } else {
                    value
                };
                self.emit(Instruction::Mov {
                    dest: Operand::Mem(slot),
                    src: value,
                });
                Ok(())
            }

            ExprKind::Unary {
                op: UnaryOp::Deref,
                operand,
            } => {
                // stash the stored value in rax while the pointer is
                // computed in scratch
                self.emit(Instruction::Mov {
                    dest: Operand::Reg(Reg::Rax),
                    src: value,
                });
                let pointer = self.lower_expr(operand)?;
                let base = match pointer {
                    Operand::Reg(reg) => MemBase::Reg(reg),
                    Operand::Mem(_) => MemBase::Reg(self.stage(pointer)),
                    Operand::Imm(Literal::Int(addr)) => MemBase::Abs(addr),
                    Operand::Imm(Literal::Float(_)) => {
                        return Err(format!(
                            "at line {}: non-integer address in assignment target",
                            left.line + 1
                        ));
                    }
                };
                self.emit(Instruction::Mov {
                    dest: Operand::Mem(MemLoc { base, offset: 0 }),
                    src: Operand::Reg(Reg::Rax),
                });
                Ok(())
            }

            _ => Err(format!(
                "internal error: invalid l-value '{}' reached code generation",
                left
            )),
        }
    }

    // ------------------------------------------------------------------
    // expressions

    fn lower_expr(&mut self, expr: &Expr) -> Result<Operand, String> {
        match &expr.kind {
            ExprKind::Literal(value) => Ok(Operand::Imm(*value)),

            ExprKind::Var { .. } => Ok(Operand::Mem(self.var_location(expr)?)),

            ExprKind::Cast { operand, .. } => self.lower_expr(operand),

            ExprKind::Binary { op, left, right } => self.lower_binary(expr, *op, left, right),

            ExprKind::Unary { op, operand } => self.lower_unary(*op, operand, expr.line),

            ExprKind::FunCall { name, args } => {
                // right-to-left, so spilled arguments push in stack order
                for (i, arg) in args.iter().enumerate().rev() {
                    let value = self.lower_expr(arg)?;
                    if i >= ARG_REGS.len() {
                        self.emit(Instruction::Push { val: value });
                    } else {
                        self.emit(Instruction::Mov {
                            dest: Operand::Reg(ARG_REGS[i]),
                            src: value,
                        });
                    }
                }
                self.emit(Instruction::Call {
                    target: name.clone(),
                });
                Ok(Operand::Reg(Reg::Rax))
            }
        }
    }

    fn lower_binary(
        &mut self,
        expr: &Expr,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
    ) -> Result<Operand, String> {
        let comparison = match op {
            BinaryOp::Equality => Some(Cc::E),
            BinaryOp::LessThan => Some(Cc::L),
            BinaryOp::LessThanEqual => Some(Cc::Le),
            BinaryOp::GreaterThan => Some(Cc::G),
            BinaryOp::GreaterThanEqual => Some(Cc::Ge),
            _ => None,
        };

        if let Some(cc) = comparison {
            let mut left_op = self.lower_expr(left)?;
            let right_op = self.lower_expr(right)?;
            // cmp cannot take an immediate destination, and never two
            // memory operands
            if left_op.is_imm() || (left_op.is_mem() && right_op.is_mem()) {
                left_op = Operand::Reg(self.stage(left_op));
            }
            self.emit(Instruction::Alu {
                op: AluMnemonic::Cmp,
                dest: left_op,
                src: right_op,
            });
            let result = self.scratch();
            self.emit(Instruction::SetCc { cc, dest: result });
            self.emit(Instruction::Movzx {
                dest: result,
                src: result,
            });
            return Ok(Operand::Reg(result));
        }

        if op == BinaryOp::Div {
            return self.lower_division(left, right);
        }

        let mnemonic = match op {
            BinaryOp::Add => AluMnemonic::Add,
            BinaryOp::Sub => AluMnemonic::Sub,
            BinaryOp::Mul => AluMnemonic::Imul,
            BinaryOp::BitAnd => AluMnemonic::And,
            BinaryOp::BitOr => AluMnemonic::Or,
            _ => {
                return Err(format!(
                    "at line {}: member access is not supported in code generation",
                    expr.line + 1
                ));
            }
        };

        let left_op = self.lower_expr(left)?;
        let right_op = self.lower_expr(right)?;
        let dest = self.scratch();
        self.emit(Instruction::Mov {
            dest: Operand::Reg(dest),
            src: left_op,
        });
        self.emit(Instruction::Alu {
            op: mnemonic,
            dest: Operand::Reg(dest),
            src: right_op,
        });
        Ok(Operand::Reg(dest))
    }

    /// Signed division: dividend in `rax` sign-extended by `cqo`, divisor
    /// as `r/m64` (immediates staged through scratch), quotient back into
    /// scratch.
    fn lower_division(&mut self, left: &Expr, right: &Expr) -> Result<Operand, String> {
        let left_op = self.lower_expr(left)?;
        let right_op = self.lower_expr(right)?;

        self.emit(Instruction::Mov {
            dest: Operand::Reg(Reg::Rax),
            src: left_op,
        });
        let divisor = if right_op.is_imm() {
            Operand::Reg(self.stage(right_op))
        } else {
            right_op
        };
        self.emit(Instruction::Cqo);
        self.emit(Instruction::Idiv { divisor });

        let result = self.scratch();
        self.emit(Instruction::Mov {
            dest: Operand::Reg(result),
            src: Operand::Reg(Reg::Rax),
        });
        Ok(Operand::Reg(result))
    }

    fn lower_unary(
        &mut self,
        op: UnaryOp,
        operand: &Expr,
        line: usize,
    ) -> Result<Operand, String> {
        match op {
            UnaryOp::Neg => {
                let value = self.lower_expr(operand)?;
                let dest = self.stage(value);
                self.emit(Instruction::Alu {
                    op: AluMnemonic::Imul,
                    dest: Operand::Reg(dest),
                    src: Operand::Imm(Literal::Int(-1)),
                });
                Ok(Operand::Reg(dest))
            }

            UnaryOp::Ref => {
                let value = self.lower_expr(operand)?;
                let dest = self.scratch();
                let loc = match value {
                    Operand::Mem(mem) => mem,
                    Operand::Reg(reg) => MemLoc::at(reg, 0),
                    Operand::Imm(_) => {
                        return Err(format!(
                            "at line {}: cannot take the address of a constant",
                            line + 1
                        ));
                    }
                };
                self.emit(Instruction::Lea {
                    dest,
                    loc,
                    index: None,
                });
                Ok(Operand::Reg(dest))
            }

            UnaryOp::Deref => {
                let pointer = self.lower_expr(operand)?;
                let dest = self.scratch();
                match pointer {
                    Operand::Reg(reg) => {
                        self.emit(Instruction::Mov {
                            dest: Operand::Reg(dest),
                            src: Operand::Mem(MemLoc::at(reg, 0)),
                        });
                    }
                    Operand::Imm(Literal::Int(addr)) => {
                        self.emit(Instruction::Mov {
                            dest: Operand::Reg(dest),
                            src: Operand::Mem(MemLoc {
                                base: MemBase::Abs(addr),
                                offset: 0,
                            }),
                        });
                    }
                    Operand::Imm(Literal::Float(_)) => {
                        return Err(format!("at line {}: non-integer address", line + 1));
                    }
                    Operand::Mem(mem) => {
                        // load the pointer, then load through it
                        self.emit(Instruction::Mov {
                            dest: Operand::Reg(dest),
                            src: Operand::Mem(mem),
                        });
                        self.emit(Instruction::Mov {
                            dest: Operand::Reg(dest),
                            src: Operand::Mem(MemLoc::at(dest, 0)),
                        });
                    }
                }
                Ok(Operand::Reg(dest))
            }
        }
    }
}
