// Stamps `shoplens --version` with the source commit, target triple and build profile.

use std::env;
use std::process::Command;

/// Packagers building from a source tarball set this instead of relying on git.
const COMMIT_OVERRIDE: &str = "SHOPLENS_BUILD_COMMIT";

fn git(args: &[&str]) -> Option<String> {
    let out = Command::new("git").args(args).output().ok()?;
    if !out.status.success() {
        return None;
    }
    let text = String::from_utf8(out.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn source_commit() -> String {
    if let Some(commit) = env::var(COMMIT_OVERRIDE).ok().filter(|c| !c.trim().is_empty()) {
        return commit.trim().to_string();
    }
    let Some(hash) = git(&["rev-parse", "--short=7", "HEAD"]) else {
        return "unknown".into();
    };
    // Uncommitted edits to tracked files mark the build as dirty.
    match git(&["status", "--porcelain", "--untracked-files=no"]) {
        Some(_) => format!("{hash}-dirty"),
        None => hash,
    }
}

fn main() {
    println!("cargo:rerun-if-env-changed={COMMIT_OVERRIDE}");
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-changed=../../.git/index");

    println!("cargo:rustc-env=GIT_COMMIT_HASH={}", source_commit());
    println!(
        "cargo:rustc-env=TARGET={}",
        env::var("TARGET").unwrap_or_else(|_| "unknown".into())
    );
    println!(
        "cargo:rustc-env=SHOPLENS_BUILD_PROFILE={}",
        env::var("PROFILE").unwrap_or_else(|_| "unknown".into())
    );
}
