// Drives the compiled binary through a pseudo terminal so the real event
// loop, raw mode, and crossterm input handling are exercised.
//
// Requires a PTY; ignored by default.
// Run manually via: `cargo test --test integration_min_session -- --ignored`.

#![cfg(unix)]

use std::process::Command;
use std::time::Duration;

use expectrl::{Eof, Session};

#[test]
#[ignore]
fn minimal_session_completes_and_exits() -> Result<(), Box<dyn std::error::Error>> {
    let home = tempfile::tempdir()?;
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin("typemaster"));
    cmd.args(["-p", "hi", "--no-history"])
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"));

    let mut p = Session::spawn(cmd)?;

    std::thread::sleep(Duration::from_millis(200));

    // Finishing the prompt moves to the results screen
    p.send("hi")?;
    std::thread::sleep(Duration::from_millis(200));

    p.send("\x1b")?; // ESC

    p.expect(Eof)?;
    Ok(())
}
