//! minic compiler library
//!
//! An ahead-of-time compiler for a strict C subset: scalar types,
//! pointers, arithmetic, `if/else`, `while`, `return`, and function calls,
//! emitting x86-64 assembly (System V AMD64, GNU assembler flavor).
//!
//! The pipeline runs lexer -> parser -> type checker -> backend. Two
//! backends share the checked AST: the shipped x86-64 emitter
//! ([`codegen`]), and a three-address-code lowering ([`tac`]) whose
//! interpreter ([`vm`]) executes programs for end-to-end tests without
//! assembling anything.
//!
//! ```rust
//! let asm = minicc::compile_to_asm(
//!     "int main() { return 0; }",
//!     &minicc::CompilerConfig::default(),
//! )
//! .unwrap();
//! assert!(asm.starts_with("main:"));
//! ```

pub mod ast;
pub mod codegen;
pub mod config;
pub mod lexer;
pub mod parser;
pub mod tac;
pub mod typechecker;
pub mod types;
pub mod vm;

pub use ast::SourceFile;
pub use codegen::CodeGen;
pub use config::CompilerConfig;
pub use lexer::tokenize;
pub use parser::Parser;
pub use tac::{TacBuilder, TacProgram};
pub use typechecker::TypeChecker;
pub use vm::{TacVm, Value};

/// Lex and parse a source buffer.
pub fn parse_source(source: &str) -> Result<SourceFile, String> {
    let tokens = lexer::tokenize(source)?;
    Parser::new(tokens, source).parse()
}

/// Lex, parse, and type-check a source buffer.
pub fn check_source(source: &str) -> Result<SourceFile, String> {
    let mut file = parse_source(source)?;
    TypeChecker::new().check_source_file(&mut file)?;
    Ok(file)
}

/// Compile a source buffer to an x86-64 assembly listing.
pub fn compile_to_asm(source: &str, config: &CompilerConfig) -> Result<String, String> {
    let file = check_source(source)?;
    let mut codegen = CodeGen::new(config);
    codegen.lower_source_file(&file)?;
    Ok(codegen.render())
}

/// Compile a source buffer to a TAC program.
pub fn compile_to_tac(source: &str) -> Result<TacProgram, String> {
    let file = check_source(source)?;
    TacBuilder::new().build(&file)
}

/// Compile a source buffer to TAC and execute it; returns the value
/// `main` returned.
pub fn run_source(source: &str) -> Result<Value, String> {
    let program = compile_to_tac(source)?;
    TacVm::new(&program).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_while_program_frame_and_loop_shape() {
        let asm = compile_to_asm(
            "int main(){ int a=0; int b=1; while(a<3){ a=a+1; } return b; }",
            &CompilerConfig::default(),
        )
        .unwrap();

        let starts = |needle: &str| {
            asm.lines()
                .filter(|l| l.trim_start().starts_with(needle))
                .count()
        };
        assert_eq!(starts("push rbp"), 1);
        assert_eq!(starts("leave"), 1);
        assert_eq!(starts("ret"), 1);
        assert_eq!(asm.lines().filter(|l| *l == "main:").count(), 1);
        assert!(asm.contains("cmp"));
        assert!(asm.contains("jne"));
    }

    #[test]
    fn test_factorial_compiles_and_runs_to_6() {
        let source = "int f(int n){ if(n==0){return 1;} return n*f(n-1);} \
                      int main(){ return f(3); }";

        let asm = compile_to_asm(source, &CompilerConfig::default()).unwrap();
        assert!(asm.contains("call f"));
        assert!(asm.contains("imul"));

        assert_eq!(run_source(source).unwrap(), Value::Int(6));
    }

    #[test]
    fn test_sum_loop_runs_to_55() {
        let source = "int main(){ int n=10; int s=0; while(n>0){ s=s+n; n=n-1; } return s; }";
        assert_eq!(run_source(source).unwrap(), Value::Int(55));
    }

    #[test]
    fn test_pointer_chain_checks_and_compiles() {
        let source = "int main(){ int a=0; int *b=&a; int **c=&b; *&*c=(int*)1; }";
        let file = check_source(source).unwrap();
        assert_eq!(file.fun_defs.len(), 1);
        compile_to_asm(source, &CompilerConfig::default()).unwrap();
        compile_to_tac(source).unwrap();
    }

    #[test]
    fn test_spill_program_reads_seventh_argument_from_stack() {
        let source = "int spill(int a,int b,int c,int d,int e,int f,int g,int h){ return g+h;} \
                      int main(){ return spill(1,2,3,4,5,6,7,8); }";
        let asm = compile_to_asm(source, &CompilerConfig::default()).unwrap();
        assert!(asm.contains("[rbp + 16]"), "{}", asm);

        assert_eq!(run_source(source).unwrap(), Value::Int(15));
    }

    #[test]
    fn test_float_return_gets_promoted_literal() {
        // the checker must wrap the returned literal; the program still
        // compiles through both backends
        check_source("float f(){ return 1; }").unwrap();
        compile_to_asm("float f(){ return 1; }", &CompilerConfig::default()).unwrap();
    }

    #[test]
    fn test_parse_error_aborts_without_output() {
        let err = compile_to_asm("int main() { return }", &CompilerConfig::default()).unwrap_err();
        assert!(err.contains("at line 1"), "{}", err);
    }

    #[test]
    fn test_lexer_error_aborts_without_output() {
        let err = compile_to_asm("int main() { return 0; } #", &CompilerConfig::default())
            .unwrap_err();
        assert!(err.contains("unrecognized character"), "{}", err);
    }

    #[test]
    fn test_semantic_error_aborts_without_output() {
        let err =
            compile_to_asm("int main() { return ghost; }", &CompilerConfig::default()).unwrap_err();
        assert!(err.contains("not defined"), "{}", err);
    }

    #[test]
    fn test_tac_listing_is_labelled() {
        let program = compile_to_tac("int main() { return 2 + 3; }").unwrap();
        let listing = program.listing();
        assert!(listing.starts_with("main:"));
        assert!(listing.contains("\tparams"));
        assert!(listing.contains("\tadd"));
        assert!(listing.contains("\tret"));
    }
}
