use std::fs;
use std::path::PathBuf;
use std::process::Command;

use lockscript_lang::compiler::{compile_contract, CompileOptions};
use rand::RngCore;

fn temp_dir(name: &str) -> PathBuf {
    let mut rng = rand::thread_rng();
    let dir = std::env::temp_dir().join(format!("lockc_test_{name}_{}", rng.next_u64()));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

const SOURCE: &str = r#"
    contract Basic(pubkey owner) {
        function claim(sig proof) {
            require(checkSig(proof, owner));
        }
    }
"#;

#[test]
fn lockc_defaults_output_path_next_to_the_source() {
    let dir = temp_dir("default");
    let src_path = dir.join("basic.lks");
    fs::write(&src_path, SOURCE).expect("write source");

    let status = Command::new(env!("CARGO_BIN_EXE_lockc")).arg(src_path.to_str().unwrap()).status().expect("run lockc");
    assert!(status.success());

    let out_path = dir.join("basic.json");
    let artifact: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out_path).expect("read artifact")).expect("parse artifact");
    assert_eq!(artifact["contract_name"], "Basic");
    assert_eq!(artifact["without_selector"], true);
    assert_eq!(artifact["abi"][0]["name"], "claim");

    let compiled = compile_contract(SOURCE, CompileOptions::default()).expect("compile in process");
    let script: Vec<u8> =
        artifact["script"].as_array().unwrap().iter().map(|byte| byte.as_u64().unwrap() as u8).collect();
    assert_eq!(script, compiled.script);
}

#[test]
fn lockc_writes_to_the_requested_output_path() {
    let dir = temp_dir("out");
    let src_path = dir.join("basic.lks");
    let out_path = dir.join("artifact.json");
    fs::write(&src_path, SOURCE).expect("write source");

    let status = Command::new(env!("CARGO_BIN_EXE_lockc"))
        .arg(src_path.to_str().unwrap())
        .arg("-o")
        .arg(out_path.to_str().unwrap())
        .status()
        .expect("run lockc");
    assert!(status.success());
    assert!(out_path.exists());
}

#[test]
fn lockc_fails_strict_and_passes_with_allow_unused() {
    let dir = temp_dir("unused");
    let src_path = dir.join("unused.lks");
    let source = r#"
        contract Unused() {
            function main(int x, bytes y) {
                require(x == 5);
            }
        }
    "#;
    fs::write(&src_path, source).expect("write source");

    let status = Command::new(env!("CARGO_BIN_EXE_lockc")).arg(src_path.to_str().unwrap()).status().expect("run lockc");
    assert!(!status.success());

    let status = Command::new(env!("CARGO_BIN_EXE_lockc"))
        .arg(src_path.to_str().unwrap())
        .arg("--allow-unused")
        .status()
        .expect("run lockc");
    assert!(status.success());
    assert!(dir.join("unused.json").exists());
}

#[test]
fn lockc_rejects_unknown_options() {
    let status = Command::new(env!("CARGO_BIN_EXE_lockc")).arg("--frobnicate").status().expect("run lockc");
    assert!(!status.success());
}
