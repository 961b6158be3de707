//! Three-address-code intermediate representation
//!
//! A checked AST lowers to a flat instruction list over program-unique
//! virtual registers `t0, t1, ...`, with an insertion-ordered label table
//! and a per-function locals list. The TAC stream is what the VM executes
//! (see `vm`); it is not on the path to the x86 backend.
//!
//! Arguments are evaluated left-to-right here; the x86 backend evaluates
//! them right-to-left to mirror push order.

use crate::ast::{
    BinaryOp, Block, Expr, ExprKind, FunDef, Literal, SourceFile, Stmt, StmtKind, UnaryOp,
};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;

/// A virtual register `t<n>`, numbered per program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VirtReg(pub usize);

impl fmt::Display for VirtReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// A value an instruction reads: an immediate, a register, a handle to a
/// stack slot created by `push` (the value of `&x`), or a memory cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Imm(Literal),
    Reg(VirtReg),
    Slot(usize),
    Mem(MemRef),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Imm(value) => write!(f, "{}", value),
            Operand::Reg(reg) => write!(f, "{}", reg),
            Operand::Slot(slot) => write!(f, "slot{}", slot),
            Operand::Mem(mem) => write!(f, "{}", mem),
        }
    }
}

/// `[base + offset]`: one memory cell, addressed by the base value.
#[derive(Debug, Clone, PartialEq)]
pub struct MemRef {
    pub base: Box<Operand>,
    pub offset: i64,
}

impl MemRef {
    pub fn new(base: Operand) -> Self {
        MemRef {
            base: Box::new(base),
            offset: 0,
        }
    }
}

impl fmt::Display for MemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.offset > 0 {
            write!(f, "[{} + {}]", self.base, self.offset)
        } else if self.offset < 0 {
            write!(f, "[{} - {}]", self.base, -self.offset)
        } else {
            write!(f, "[{}]", self.base)
        }
    }
}

/// A place an instruction writes to.
#[derive(Debug, Clone, PartialEq)]
pub enum Dest {
    Reg(VirtReg),
    Mem(MemRef),
}

impl fmt::Display for Dest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dest::Reg(reg) => write!(f, "{}", reg),
            Dest::Mem(mem) => write!(f, "{}", mem),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Sub,
    Imul,
    Div,
    And,
    Or,
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl AluOp {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            AluOp::Add => "add",
            AluOp::Sub => "sub",
            AluOp::Imul => "imul",
            AluOp::Div => "div",
            AluOp::And => "and",
            AluOp::Or => "or",
            AluOp::Eq => "eq",
            AluOp::Lt => "lt",
            AluOp::Lte => "lte",
            AluOp::Gt => "gt",
            AluOp::Gte => "gte",
        }
    }

    /// The TAC opcode for an AST binary operator; `dot` has none.
    fn from_binary(op: BinaryOp) -> Option<AluOp> {
        match op {
            BinaryOp::Add => Some(AluOp::Add),
            BinaryOp::Sub => Some(AluOp::Sub),
            BinaryOp::Mul => Some(AluOp::Imul),
            BinaryOp::Div => Some(AluOp::Div),
            BinaryOp::Equality => Some(AluOp::Eq),
            BinaryOp::LessThan => Some(AluOp::Lt),
            BinaryOp::LessThanEqual => Some(AluOp::Lte),
            BinaryOp::GreaterThan => Some(AluOp::Gt),
            BinaryOp::GreaterThanEqual => Some(AluOp::Gte),
            BinaryOp::BitAnd => Some(AluOp::And),
            BinaryOp::BitOr => Some(AluOp::Or),
            BinaryOp::Dot => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TacInstruction {
    Move {
        dest: Dest,
        src: Operand,
    },
    Jump {
        target: String,
    },
    JumpIf {
        target: String,
        cond: Operand,
    },
    JumpIfNot {
        target: String,
        cond: Operand,
    },
    /// Binds incoming argument values to parameter registers; placed
    /// immediately after a function's label.
    Params {
        regs: Vec<VirtReg>,
    },
    Call {
        target: String,
        out: VirtReg,
        args: Vec<Operand>,
    },
    Ret {
        src: Operand,
    },
    Push {
        val: Operand,
        slot: usize,
    },
    Pop {
        dest: Dest,
    },
    Alu {
        op: AluOp,
        dest: VirtReg,
        left: Operand,
        right: Operand,
    },
}

impl fmt::Display for TacInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TacInstruction::Move { dest, src } => write!(f, "move {}, {}", dest, src),
            TacInstruction::Jump { target } => write!(f, "jump {}", target),
            TacInstruction::JumpIf { target, cond } => write!(f, "jump_if {}, {}", target, cond),
            TacInstruction::JumpIfNot { target, cond } => {
                write!(f, "jump_ifnot {}, {}", target, cond)
            }
            TacInstruction::Params { regs } => {
                let regs: Vec<String> = regs.iter().map(VirtReg::to_string).collect();
                write!(f, "params {}", regs.join(", "))
            }
            TacInstruction::Call { target, out, args } => {
                let args: Vec<String> = args.iter().map(Operand::to_string).collect();
                write!(f, "call {}, {}, {}", target, out, args.join(", "))
            }
            TacInstruction::Ret { src } => write!(f, "ret {}", src),
            TacInstruction::Push { val, .. } => write!(f, "push {}", val),
            TacInstruction::Pop { dest } => write!(f, "pop {}", dest),
            TacInstruction::Alu {
                op,
                dest,
                left,
                right,
            } => write!(f, "{} {}, {}, {}", op.mnemonic(), dest, left, right),
        }
    }
}

/// A named local and the register that carries it, in definition order.
#[derive(Debug, Clone, PartialEq)]
pub struct FunLocal {
    pub ir_name: String,
    pub reg: VirtReg,
}

/// A complete lowered program.
#[derive(Debug, Clone)]
pub struct TacProgram {
    pub instructions: Vec<TacInstruction>,
    /// Label -> instruction index, in insertion (= target) order
    pub labels: IndexMap<String, usize>,
    /// Function label -> locals, parameters first
    pub fun_locals: IndexMap<String, Vec<FunLocal>>,
    /// Number of stack slots allocated by `push` instructions
    pub slot_count: usize,
}

impl TacProgram {
    /// Render the labelled, tab-indented listing.
    pub fn listing(&self) -> String {
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
}

/// Lowers one checked source file; single use.
pub struct TacBuilder {
    instructions: Vec<TacInstruction>,
    labels: IndexMap<String, usize>,
    fun_locals: IndexMap<String, Vec<FunLocal>>,
    label_idx: usize,
    reg_idx: usize,
    slot_idx: usize,
    /// ir_name -> register, for the function currently being lowered
    var_regs: HashMap<String, VirtReg>,
    current_function: String,
}

impl TacBuilder {
    pub fn new() -> Self {
        TacBuilder {
            instructions: Vec::new(),
            labels: IndexMap::new(),
            fun_locals: IndexMap::new(),
            label_idx: 0,
            reg_idx: 0,
            slot_idx: 0,
            var_regs: HashMap::new(),
            current_function: String::new(),
        }
    }

    pub fn build(mut self, src: &SourceFile) -> Result<TacProgram, String> {
        for fun in &src.fun_defs {
            self.lower_fun_def(fun)?;
        }
        Ok(TacProgram {
            instructions: self.instructions,
            labels: self.labels,
            fun_locals: self.fun_locals,
            slot_count: self.slot_idx,
        })
    }

    fn emit(&mut self, instruction: TacInstruction) {
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

    fn next_reg(&mut self) -> VirtReg {
        let reg = VirtReg(self.reg_idx);
        self.reg_idx += 1;
        reg
    }

    fn next_slot(&mut self) -> usize {
        let slot = self.slot_idx;
        self.slot_idx += 1;
        slot
    }

    /// The register carrying a checked variable reference.
    fn var_reg(&self, expr: &Expr) -> Result<VirtReg, String> {
        let ir_name = expr
            .ir_name()
            .ok_or_else(|| format!("internal error: unresolved variable '{}'", expr))?;
        self.var_regs.get(ir_name).copied().ok_or_else(|| {
            format!("internal error: variable '{}' has no register", ir_name)
        })
    }

    /// Allocate the register for a new definition and record it in the
    /// function's locals list.
    fn define_local(&mut self, ir_name: &str) -> Result<VirtReg, String> {
        let reg = self.next_reg();
        self.var_regs.insert(ir_name.to_string(), reg);
        self.fun_locals
            .get_mut(&self.current_function)
            .ok_or_else(|| "internal error: no current function".to_string())?
            .push(FunLocal {
                ir_name: ir_name.to_string(),
                reg,
            });
        Ok(reg)
    }

    fn lower_fun_def(&mut self, fun: &FunDef) -> Result<(), String> {
        self.insert_label(fun.name.clone());
        self.current_function = fun.name.clone();
        self.var_regs.clear();
        self.fun_locals.insert(fun.name.clone(), Vec::new());

        let mut param_regs = Vec::new();
        for param in &fun.params {
            let ir_name = param
                .ir_name
                .as_deref()
                .ok_or_else(|| format!("internal error: unresolved parameter '{}'", param.name))?;
            param_regs.push(self.define_local(ir_name)?);
        }
        self.emit(TacInstruction::Params { regs: param_regs });

        self.lower_block(&fun.body)
    }

    fn lower_block(&mut self, block: &Block) -> Result<(), String> {
        for stmt in &block.statements {
            self.lower_stmt(stmt)?;
        }
        Ok(())
    }

    fn lower_stmt(&mut self, stmt: &Stmt) -> Result<(), String> {
        match &stmt.kind {
            StmtKind::Assign {
                left,
                right,
                is_define,
                ..
            } => {
                let right_val = self.lower_expr(right)?;
                if *is_define {
                    let ir_name = left
                        .ir_name()
                        .ok_or_else(|| {
                            format!("internal error: unresolved definition '{}'", left)
                        })?
                        .to_string();
                    let reg = self.define_local(&ir_name)?;
                    self.emit(TacInstruction::Move {
                        dest: Dest::Reg(reg),
                        src: right_val,
                    });
                    return Ok(());
                }

                match &left.kind {
                    ExprKind::Var { .. } => {
                        let reg = self.var_reg(left)?;
                        self.emit(TacInstruction::Move {
                            dest: Dest::Reg(reg),
                            src: right_val,
                        });
                    }
                    ExprKind::Unary {
                        op: UnaryOp::Deref,
                        operand,
                    } => {
                        let pointer = self.lower_expr(operand)?;
                        self.emit(TacInstruction::Move {
                            dest: Dest::Mem(MemRef::new(pointer)),
                            src: right_val,
                        });
                    }
                    _ => {
                        return Err(format!(
                            "internal error: invalid l-value '{}' reached IR generation",
                            left
                        ));
                    }
                }
                Ok(())
            }

            StmtKind::Return { expr } => {
                let src = self.lower_expr(expr)?;
                self.emit(TacInstruction::Ret { src });
                Ok(())
            }

            StmtKind::Expr { expr } => {
                self.lower_expr(expr)?;
                Ok(())
            }

            StmtKind::Block(block) => self.lower_block(block),

            StmtKind::While { condition, body } => {
                let test_label = self.next_label(condition.line);
                let body_label = self.next_label(condition.line);

                // test before the first iteration
                self.emit(TacInstruction::Jump {
                    target: test_label.clone(),
                });
                self.insert_label(body_label.clone());
                self.lower_block(body)?;

                self.insert_label(test_label);
                let cond = self.lower_expr(condition)?;
                self.emit(TacInstruction::JumpIf {
                    target: body_label,
                    cond,
                });
                Ok(())
            }

            StmtKind::IfElse {
                condition,
                if_body,
                else_body,
            } => {
                let cond = self.lower_expr(condition)?;
                match else_body {
                    Some(else_stmt) => {
                        let else_label = self.next_label(else_stmt.line);
                        let end_label = self.next_label(stmt.line);

                        self.emit(TacInstruction::JumpIfNot {
                            target: else_label.clone(),
                            cond,
                        });
                        self.lower_block(if_body)?;
                        self.emit(TacInstruction::Jump {
                            target: end_label.clone(),
                        });

                        self.insert_label(else_label);
                        self.lower_stmt(else_stmt)?;
                        self.insert_label(end_label);
                    }
                    None => {
                        let end_label = self.next_label(stmt.line);
                        self.emit(TacInstruction::JumpIfNot {
                            target: end_label.clone(),
                            cond,
                        });
                        self.lower_block(if_body)?;
                        self.insert_label(end_label);
                    }
                }
                Ok(())
            }
        }
    }

    fn lower_expr(&mut self, expr: &Expr) -> Result<Operand, String> {
        match &expr.kind {
            ExprKind::Literal(value) => Ok(Operand::Imm(*value)),

            ExprKind::Var { .. } => Ok(Operand::Reg(self.var_reg(expr)?)),

            ExprKind::Cast { operand, .. } => self.lower_expr(operand),

            ExprKind::FunCall { name, args } => {
                let mut arg_vals = Vec::new();
                for arg in args {
                    arg_vals.push(self.lower_expr(arg)?);
                }
                let out = self.next_reg();
                self.emit(TacInstruction::Call {
                    target: name.clone(),
                    out,
                    args: arg_vals,
                });
                Ok(Operand::Reg(out))
            }

            ExprKind::Binary { op, left, right } => {
                let op = AluOp::from_binary(*op).ok_or_else(|| {
                    format!(
                        "at line {}: member access is not supported in IR generation",
                        expr.line + 1
                    )
                })?;
                let left = self.lower_expr(left)?;
                let right = self.lower_expr(right)?;
                let dest = self.next_reg();
                self.emit(TacInstruction::Alu {
                    op,
                    dest,
                    left,
                    right,
                });
                Ok(Operand::Reg(dest))
            }

            ExprKind::Unary { op, operand } => match op {
                UnaryOp::Neg => {
                    let val = self.lower_expr(operand)?;
                    let dest = self.next_reg();
                    self.emit(TacInstruction::Alu {
                        op: AluOp::Sub,
                        dest,
                        left: Operand::Imm(Literal::Int(0)),
                        right: val,
                    });
                    Ok(Operand::Reg(dest))
                }
                UnaryOp::Ref => {
                    let val = self.lower_expr(operand)?;
                    let slot = self.next_slot();
                    self.emit(TacInstruction::Push { val, slot });
                    Ok(Operand::Slot(slot))
                }
                UnaryOp::Deref => {
                    let pointer = self.lower_expr(operand)?;
                    let dest = self.next_reg();
                    self.emit(TacInstruction::Move {
                        dest: Dest::Reg(dest),
                        src: Operand::Mem(MemRef::new(pointer)),
                    });
                    Ok(Operand::Reg(dest))
                }
            },
        }
    }
}

impl Default for TacBuilder {
    fn default() -> Self {
        TacBuilder::new()
    }
}
