//! Reference interpreter for the TAC stream
//!
//! Executes a lowered program for test-driven validation, without emitting
//! native code. The machine models a register file over the program's
//! virtual registers, a sparse memory holding one value per cell, and a
//! downward-growing stack used by call frames and `push` slots.
//!
//! Calling convention: the caller's frame saves its `bp`, return address,
//! and live local registers below `bp`; arguments travel through a shared
//! queue that the callee's `params` instruction drains in reverse. A `ret`
//! with no awaiting caller is `main` returning: the value lands in `rt`
//! and the machine halts.

use crate::ast::Literal;
use crate::tac::{AluOp, Dest, MemRef, Operand, TacInstruction, TacProgram, VirtReg};
use std::collections::HashMap;
use std::fmt;

/// A runtime value: the VM is dynamically typed over ints and floats.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
        }
    }
}

impl From<Literal> for Value {
    fn from(literal: Literal) -> Self {
        match literal {
            Literal::Int(n) => Value::Int(n),
            Literal::Float(x) => Value::Float(x),
        }
    }
}

impl Value {
    fn as_f64(&self) -> f64 {
        match self {
            Value::Int(n) => *n as f64,
            Value::Float(x) => *x,
        }
    }

    fn is_truthy(&self) -> bool {
        match self {
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
        }
    }
}

/// Dispatch one ALU operation. Integer pairs stay integral for the ring
/// operations; `div` is true division and always produces a float;
/// comparisons produce 0/1; the bitwise operations are integer-only.
fn alu(op: AluOp, left: Value, right: Value) -> Result<Value, String> {
    use Value::{Float, Int};

    let int_pair = match (left, right) {
        (Int(l), Int(r)) => Some((l, r)),
        _ => None,
    };

    match op {
        AluOp::Add => Ok(match int_pair {
            Some((l, r)) => Int(l.wrapping_add(r)),
            None => Float(left.as_f64() + right.as_f64()),
        }),
        AluOp::Sub => Ok(match int_pair {
            Some((l, r)) => Int(l.wrapping_sub(r)),
            None => Float(left.as_f64() - right.as_f64()),
        }),
        AluOp::Imul => Ok(match int_pair {
            Some((l, r)) => Int(l.wrapping_mul(r)),
            None => Float(left.as_f64() * right.as_f64()),
        }),
        AluOp::Div => {
            if right.as_f64() == 0.0 {
                return Err("division by zero".to_string());
            }
            Ok(Float(left.as_f64() / right.as_f64()))
        }
        AluOp::Eq => Ok(Int((left.as_f64() == right.as_f64()) as i64)),
        AluOp::Lt => Ok(Int((left.as_f64() < right.as_f64()) as i64)),
        AluOp::Lte => Ok(Int((left.as_f64() <= right.as_f64()) as i64)),
        AluOp::Gt => Ok(Int((left.as_f64() > right.as_f64()) as i64)),
        AluOp::Gte => Ok(Int((left.as_f64() >= right.as_f64()) as i64)),
        AluOp::And | AluOp::Or => match (left, right) {
            (Int(l), Int(r)) => Ok(Int(if op == AluOp::And { l & r } else { l | r })),
            _ => Err(format!(
                "bitwise '{}' requires integer operands",
                op.mnemonic()
            )),
        },
    }
}

pub struct TacVm<'a> {
    program: &'a TacProgram,
    pc: usize,
    regs: HashMap<VirtReg, Value>,
    memory: HashMap<i64, Value>,
    sp: i64,
    bp: i64,
    /// Saved program counter of the pending call instruction
    ra: usize,
    /// Value returned by `main`
    rt: Value,
    /// Slot handle -> resolved stack address, filled by `push`
    slot_addrs: HashMap<usize, i64>,
    current_function: String,
    caller_stack: Vec<String>,
    /// Shared argument queue between `call` and `params`
    arg_queue: Vec<Value>,
    /// Awaiting out-registers, one per active call
    ret_regs: Vec<VirtReg>,
    halted: bool,
}

impl<'a> TacVm<'a> {
    pub fn new(program: &'a TacProgram) -> Self {
        TacVm {
            program,
            pc: 0,
            regs: HashMap::new(),
            memory: HashMap::new(),
            sp: 0xFFFF,
            bp: 0xFFFF,
            ra: 0,
            rt: Value::Int(0),
            slot_addrs: HashMap::new(),
            current_function: String::new(),
            caller_stack: Vec::new(),
            arg_queue: Vec::new(),
            ret_regs: Vec::new(),
            halted: false,
        }
    }

    /// Execute from the `main` label until `main` returns or the
    /// instruction stream runs out. Returns the value of `rt`.
    pub fn run(&mut self) -> Result<Value, String> {
        self.pc = *self
            .program
            .labels
            .get("main")
            .ok_or_else(|| "no main function defined".to_string())?;
        self.current_function = "main".to_string();

        while !self.halted && self.pc < self.program.instructions.len() {
            self.step()?;
        }
        Ok(self.rt)
    }

    pub fn return_value(&self) -> Value {
        self.rt
    }

    pub fn registers(&self) -> &HashMap<VirtReg, Value> {
        &self.regs
    }

    pub fn memory(&self) -> &HashMap<i64, Value> {
        &self.memory
    }

    /// The current value of a named local of `fun`, if it has one.
    pub fn local(&self, fun: &str, ir_name: &str) -> Option<Value> {
        let locals = self.program.fun_locals.get(fun)?;
        let local = locals.iter().find(|l| l.ir_name == ir_name)?;
        self.regs.get(&local.reg).copied()
    }

    fn label_target(&self, label: &str) -> Result<usize, String> {
        self.program
            .labels
            .get(label)
            .copied()
            .ok_or_else(|| format!("jump to undefined label '{}'", label))
    }

    fn load(&self, operand: &Operand) -> Result<Value, String> {
        match operand {
            Operand::Imm(literal) => Ok((*literal).into()),
            Operand::Reg(reg) => self
                .regs
                .get(reg)
                .copied()
                .ok_or_else(|| format!("read of unset register {}", reg)),
            Operand::Slot(slot) => self
                .slot_addrs
                .get(slot)
                .map(|addr| Value::Int(*addr))
                .ok_or_else(|| format!("read of unresolved stack slot {}", slot)),
            Operand::Mem(mem) => {
                let addr = self.address(mem)?;
                self.memory
                    .get(&addr)
                    .copied()
                    .ok_or_else(|| format!("read of unset memory cell [{}]", addr))
            }
        }
    }

    fn address(&self, mem: &MemRef) -> Result<i64, String> {
        match self.load(&mem.base)? {
            Value::Int(base) => Ok(base + mem.offset),
            Value::Float(x) => Err(format!("non-integer address {}", x)),
        }
    }

    fn store(&mut self, dest: &Dest, value: Value) -> Result<(), String> {
        match dest {
            Dest::Reg(reg) => {
                self.regs.insert(*reg, value);
            }
            Dest::Mem(mem) => {
                let addr = self.address(mem)?;
                self.memory.insert(addr, value);
            }
        }
        Ok(())
    }

    /// Save the caller's frame: old `bp` at `[bp]`, return address at
    /// `[bp-1]`, then every live local register at `[bp-i-2]`. Locals not
    /// yet assigned leave holes.
    fn push_frame(&mut self) -> Result<(), String> {
        self.caller_stack.push(self.current_function.clone());

        let old_bp = self.bp;
        self.bp = self.sp;
        self.memory.insert(self.bp, Value::Int(old_bp));
        self.sp -= 1;
        self.memory.insert(self.bp - 1, Value::Int(self.ra as i64));
        self.sp -= 1;
        self.ra = self.pc;

        let locals = self
            .program
            .fun_locals
            .get(&self.current_function)
            .ok_or_else(|| format!("unknown function '{}'", self.current_function))?;
        for (i, local) in locals.iter().enumerate() {
            if let Some(value) = self.regs.get(&local.reg).copied() {
                self.memory.insert(self.bp - i as i64 - 2, value);
                self.sp -= 1;
            }
        }
        Ok(())
    }

    /// Restore the caller's locals, `ra`, and `bp`; returns the program
    /// counter of the call instruction being returned to.
    fn pop_frame(&mut self) -> Result<usize, String> {
        let caller = self
            .caller_stack
            .pop()
            .ok_or_else(|| "return with no caller frame".to_string())?;
        self.current_function = caller.clone();

        let locals = self
            .program
            .fun_locals
            .get(&caller)
            .ok_or_else(|| format!("unknown function '{}'", caller))?;
        let restores: Vec<(VirtReg, i64)> = locals
            .iter()
            .enumerate()
            .map(|(i, local)| (local.reg, self.bp - i as i64 - 2))
            .collect();
        for (reg, addr) in restores {
            if let Some(value) = self.memory.get(&addr).copied() {
                self.regs.insert(reg, value);
            }
        }

        let return_to = self.ra;
        let saved_ra = match self.memory.get(&(self.bp - 1)).copied() {
            Some(Value::Int(addr)) => addr as usize,
            _ => return Err("corrupt frame: missing return address".to_string()),
        };
        let saved_bp = match self.memory.get(&self.bp).copied() {
            Some(Value::Int(addr)) => addr,
            _ => return Err("corrupt frame: missing base pointer".to_string()),
        };
        self.ra = saved_ra;
        self.bp = saved_bp;
        self.sp = self.bp;

        Ok(return_to)
    }

    fn step(&mut self) -> Result<(), String> {
        let instruction = self.program.instructions[self.pc].clone();
        let mut next_pc = self.pc + 1;

        match instruction {
            TacInstruction::Move { dest, src } => {
                let value = self.load(&src)?;
                self.store(&dest, value)?;
            }

            TacInstruction::Jump { target } => {
                next_pc = self.label_target(&target)?;
            }

            TacInstruction::JumpIf { target, cond } => {
                if self.load(&cond)?.is_truthy() {
                    next_pc = self.label_target(&target)?;
                }
            }

            TacInstruction::JumpIfNot { target, cond } => {
                if !self.load(&cond)?.is_truthy() {
                    next_pc = self.label_target(&target)?;
                }
            }

            TacInstruction::Call { target, out, args } => {
                self.push_frame()?;
                for arg in &args {
                    let value = self.load(arg)?;
                    self.arg_queue.push(value);
                }
                self.ret_regs.push(out);
                self.current_function = target.clone();
                next_pc = self.label_target(&target)?;
            }

            TacInstruction::Params { regs } => {
                for reg in regs.iter().rev() {
                    let value = self
                        .arg_queue
                        .pop()
                        .ok_or_else(|| "missing argument value".to_string())?;
                    self.regs.insert(*reg, value);
                }
            }

            TacInstruction::Ret { src } => {
                let value = self.load(&src)?;
                match self.ret_regs.pop() {
                    Some(out) => {
                        self.regs.insert(out, value);
                        next_pc = self.pop_frame()? + 1;
                    }
                    None => {
                        // main returned
                        self.rt = value;
                        self.halted = true;
                    }
                }
            }

            TacInstruction::Push { val, slot } => {
                let value = self.load(&val)?;
                let addr = self.sp;
                self.slot_addrs.insert(slot, addr);
                self.memory.insert(addr, value);
                self.sp -= 1;
            }

            TacInstruction::Pop { dest } => {
                self.sp += 1;
                let value = self
                    .memory
                    .get(&self.sp)
                    .copied()
                    .ok_or_else(|| format!("pop from unset memory cell [{}]", self.sp))?;
                self.store(&dest, value)?;
            }

            TacInstruction::Alu {
                op,
                dest,
                left,
                right,
            } => {
                let left = self.load(&left)?;
                let right = self.load(&right)?;
                let result = alu(op, left, right)?;
                self.regs.insert(dest, result);
            }
        }

        self.pc = next_pc;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::Parser;
    use crate::tac::TacBuilder;
    use crate::typechecker::TypeChecker;

    fn run(source: &str) -> (Value, TacProgram) {
        let tokens = tokenize(source).unwrap();
        let mut file = Parser::new(tokens, source).parse().unwrap();
        TypeChecker::new().check_source_file(&mut file).unwrap();
        let program = TacBuilder::new().build(&file).unwrap();
        let value = TacVm::new(&program).run().unwrap();
        (value, program)
    }

    fn run_with_vm(source: &str, inspect: impl FnOnce(&TacVm)) -> Value {
        let tokens = tokenize(source).unwrap();
        let mut file = Parser::new(tokens, source).parse().unwrap();
        TypeChecker::new().check_source_file(&mut file).unwrap();
        let program = TacBuilder::new().build(&file).unwrap();
        let mut vm = TacVm::new(&program);
        let value = vm.run().unwrap();
        inspect(&vm);
        value
    }

    #[test]
    fn test_sum_loop_returns_55() {
        let (value, _) =
            run("int main() { int n = 10; int s = 0; while (n > 0) { s = s + n; n = n - 1; } return s; }");
        assert_eq!(value, Value::Int(55));
    }

    #[test]
    fn test_while_condition_checked_before_first_iteration() {
        let (value, _) =
            run("int main() { int a = 7; while (0) { a = 99; } return a; }");
        assert_eq!(value, Value::Int(7));
    }

    #[test]
    fn test_recursive_factorial() {
        let (value, _) = run(
            "int f(int n) { if (n == 0) { return 1; } return n*f(n-1); } \
             int main() { return f(3); }",
        );
        assert_eq!(value, Value::Int(6));
    }

    #[test]
    fn test_fibonacci_iteration() {
        let (value, _) = run(
            "int main() { int n = 10; int a = 0; int b = 1; \
             while (n > 0) { n = n - 1; int tmp = b; b = a + b; a = tmp; } return a; }",
        );
        assert_eq!(value, Value::Int(55));
    }

    #[test]
    fn test_if_else_branching() {
        let (value, _) = run(
            "int sign(int x) { if (x > 0) { return 1; } else if (x == 0) { return 0; } \
             else { return 0 - 1; } } \
             int main() { return sign(0 - 5) + sign(0) + sign(9); }",
        );
        assert_eq!(value, Value::Int(0));
    }

    #[test]
    fn test_pointer_read_through_double_deref() {
        let value = run_with_vm(
            "int main() { int n = 10; int *b = &n; int **c = &b; int a = **c; return a; }",
            |vm| {
                assert_eq!(vm.local("main", "a_3"), Some(Value::Int(10)));
            },
        );
        assert_eq!(value, Value::Int(10));
    }

    #[test]
    fn test_deref_store_through_pointer() {
        // &n copies n into a stack slot; *b writes and re-reads that slot
        let (value, _) =
            run("int main() { int n = 1; int *b = &n; *b = 42; return *b; }");
        assert_eq!(value, Value::Int(42));
    }

    #[test]
    fn test_spilled_arguments_reach_callee() {
        let (value, _) = run(
            "int spill(int a, int b, int c, int d, int e, int f, int g, int h) { return g + h; } \
             int main() { return spill(1, 2, 3, 4, 5, 6, 7, 8); }",
        );
        assert_eq!(value, Value::Int(15));
    }

    #[test]
    fn test_nested_calls_preserve_caller_locals() {
        let (value, _) = run(
            "int twice(int x) { return x + x; } \
             int main() { int keep = 5; int r = twice(twice(10)); return keep + r; }",
        );
        assert_eq!(value, Value::Int(45));
    }

    #[test]
    fn test_true_division_produces_float() {
        let (value, _) = run("double main() { return 7 / 2; }");
        assert_eq!(value, Value::Float(3.5));
    }

    #[test]
    fn test_division_by_zero_is_error() {
        let source = "int main() { return 1 / 0; }";
        let tokens = tokenize(source).unwrap();
        let mut file = Parser::new(tokens, source).parse().unwrap();
        TypeChecker::new().check_source_file(&mut file).unwrap();
        let program = TacBuilder::new().build(&file).unwrap();
        let err = TacVm::new(&program).run().unwrap_err();
        assert!(err.contains("division by zero"), "{}", err);
    }

    #[test]
    fn test_bitwise_ops() {
        let (value, _) = run("int main() { return (12 & 10) | 1; }");
        assert_eq!(value, Value::Int(9));
    }

    #[test]
    fn test_main_without_return_leaves_rt_zero() {
        let (value, _) = run("int main() { int a = 3; }");
        assert_eq!(value, Value::Int(0));
    }

    #[test]
    fn test_push_pop_round_trip() {
        use indexmap::IndexMap;

        // hand-assembled: push 41, pop it into t0, return t0 + 1
        let mut labels = IndexMap::new();
        labels.insert("main".to_string(), 0);
        let mut fun_locals = IndexMap::new();
        fun_locals.insert("main".to_string(), Vec::new());
        let program = TacProgram {
            instructions: vec![
                TacInstruction::Params { regs: vec![] },
                TacInstruction::Push {
                    val: Operand::Imm(Literal::Int(41)),
                    slot: 0,
                },
                TacInstruction::Pop {
                    dest: Dest::Reg(VirtReg(0)),
                },
                TacInstruction::Alu {
                    op: AluOp::Add,
                    dest: VirtReg(1),
                    left: Operand::Reg(VirtReg(0)),
                    right: Operand::Imm(Literal::Int(1)),
                },
                TacInstruction::Ret {
                    src: Operand::Reg(VirtReg(1)),
                },
            ],
            labels,
            fun_locals,
            slot_count: 1,
        };

        let value = TacVm::new(&program).run().unwrap();
        assert_eq!(value, Value::Int(42));
    }

    #[test]
    fn test_missing_main_is_error() {
        let source = "int f() { return 1; }";
        let tokens = tokenize(source).unwrap();
        let mut file = Parser::new(tokens, source).parse().unwrap();
        TypeChecker::new().check_source_file(&mut file).unwrap();
        let program = TacBuilder::new().build(&file).unwrap();
        let err = TacVm::new(&program).run().unwrap_err();
        assert!(err.contains("no main function"), "{}", err);
    }
}
