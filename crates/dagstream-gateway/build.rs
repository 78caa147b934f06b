use std::process::Command;

/// Exposes `DAGSTREAM_GIT_SHA` to the crate for `/health`.
///
/// A value already present in the build environment wins, so builds from a
/// source tarball (no `.git`) can still be stamped.
fn main() {
    println!("cargo:rerun-if-env-changed=DAGSTREAM_GIT_SHA");
    println!("cargo:rerun-if-changed=../../.git/HEAD");

    let sha = std::env::var("DAGSTREAM_GIT_SHA")
        .ok()
        .filter(|s| !s.is_empty())
        .or_else(git_short_sha)
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=DAGSTREAM_GIT_SHA={sha}");
}

fn git_short_sha() -> Option<String> {
    let out = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    out.status
        .success()
        .then(|| String::from_utf8_lossy(&out.stdout).trim().to_string())
}
