use std::process::Command;

#[test]
fn exit_code_is_105() {
    let status = Command::new(env!("CARGO_BIN_EXE_sample"))
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(105));
}
