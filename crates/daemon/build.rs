use std::process::Command;

fn main() {
    let hash = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|hash| hash.trim().to_string())
        .unwrap_or_else(|| "dev".to_string());

    println!("cargo:rustc-env=BUILD_GIT_HASH={}", hash);
    println!("cargo:rerun-if-changed=build.rs");
}
