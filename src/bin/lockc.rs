use std::env;
use std::fs;
use std::path::PathBuf;

use lockscript_lang::compiler::{compile_contract, CompileOptions};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        return Err("usage: lockc <src.lks> [-o dst.json] [--allow-unused] [--allow-constant-conditions]".to_string());
    }

    let mut src: Option<String> = None;
    let mut out_path: Option<String> = None;
    let mut options = CompileOptions::default();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--allow-unused" => {
                options.allow_unused = true;
                i += 1;
            }
            "--allow-constant-conditions" => {
                options.allow_constant_conditions = true;
                i += 1;
            }
            "-o" => {
                let value = args.get(i + 1).ok_or_else(|| "-o requires a path".to_string())?;
                out_path = Some(value.clone());
                i += 2;
            }
            value if value.starts_with('-') => {
                return Err(format!("unknown option: {value}"));
            }
            value => {
                if src.is_some() {
                    return Err("only one source file is supported".to_string());
                }
                src = Some(value.to_string());
                i += 1;
            }
        }
    }

    let src = src.ok_or_else(|| "missing source file".to_string())?;
    let source = fs::read_to_string(&src).map_err(|err| format!("failed to read {src}: {err}"))?;

    let compiled = compile_contract(&source, options).map_err(|err| format!("compile error: {err}"))?;
    for warning in &compiled.warnings {
        eprintln!("warning: {warning}");
    }

    let output_path = match out_path {
        Some(path) => PathBuf::from(path),
        None => default_output_path(&src),
    };

    let json = serde_json::to_string_pretty(&compiled).map_err(|err| format!("failed to serialize output: {err}"))?;
    fs::write(&output_path, json).map_err(|err| format!("failed to write {}: {err}", output_path.display()))?;

    Ok(())
}

fn default_output_path(src: &str) -> PathBuf {
    if let Some(stripped) = src.strip_suffix(".lks") {
        PathBuf::from(format!("{stripped}.json"))
    } else {
        PathBuf::from(format!("{src}.json"))
    }
}
