use driftlang::codegen::Codegen;
use driftlang::error::CompileError;
use driftlang::ir;
use driftlang::lexer::TokenStream;
use driftlang::llvm::LLVMCodegen;
use driftlang::parser::Parser;

use ariadne::Source;
use inkwell::context::Context;
use yansi::Paint;

use std::fs;
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let Some(filepath) = args.next() else {
        eprintln!("usage: driftc <file> [-o <output.ll>] [--dump-ir]");
        return ExitCode::FAILURE;
    };

    let mut output = None;
    let mut dump_ir = false;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-o" => match args.next() {
                Some(path) => output = Some(path),
                None => {
                    eprintln!("{}: '-o' needs a path", "error".red().bold());
                    return ExitCode::FAILURE;
                }
            },
            "--dump-ir" => dump_ir = true,
            other => {
                eprintln!("{}: unknown argument '{}'", "error".red().bold(), other);
                return ExitCode::FAILURE;
            }
        }
    }

    let contents = match fs::read_to_string(&filepath) {
        Ok(contents) => contents,
        Err(err) => {
            eprintln!(
                "{}: cannot read {}: {}",
                "error".red().bold(),
                filepath,
                err
            );
            return ExitCode::FAILURE;
        }
    };

    let module_name = Path::new(&filepath)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("module")
        .to_string();

    let module = match compile(&module_name, &contents) {
        Ok(module) => module,
        Err(err) => {
            report(&err, &filepath, &contents);
            return ExitCode::FAILURE;
        }
    };

    if dump_ir {
        print!("{}", module);
        return ExitCode::SUCCESS;
    }

    let context = Context::create();
    let mut backend = LLVMCodegen::new(&context, &module_name);
    if let Err(message) = backend.generate_module(&module) {
        eprintln!("{}: {}", "error".red().bold(), message);
        return ExitCode::FAILURE;
    }

    match output {
        Some(path) => {
            if let Err(message) = backend.emit_to_file(&path) {
                eprintln!("{}: {}", "error".red().bold(), message);
                return ExitCode::FAILURE;
            }
            eprintln!("{} wrote {}", "ok".green().bold(), path);
        }
        None => print!("{}", backend.print_to_string()),
    }
    ExitCode::SUCCESS
}

fn compile(module_name: &str, contents: &str) -> Result<ir::Module, CompileError> {
    let tokens = TokenStream::new(contents)?;
    let mut parser = Parser::new(tokens);
    let program = parser.parse_program()?;
    let mut codegen = Codegen::new(module_name);
    codegen.generate_program(&program)?;
    codegen.finish()
}

fn report(err: &CompileError, filepath: &str, contents: &str) {
    if err
        .report(filepath)
        .eprint((filepath, Source::from(contents)))
        .is_err()
    {
        // fall back to the plain excerpt if the terminal write failed
        eprintln!("{}{}", err, err.snippet(contents));
    }
}
