use chrono::Utc;
use std::{
    fs, io,
    path::{Path, PathBuf},
    process::Command,
};

fn main() -> io::Result<()> {
    println!("cargo:rerun-if-changed=VERSION");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads");
    println!("cargo:rerun-if-changed=config.example.yaml");

    set_build_metadata();

    // 复制示例配置到构建输出目录，便于直接部署
    if let Some(out_dir) = deploy_dir() {
        copy_config_files(&out_dir)?;
    }

    Ok(())
}

/// target/<profile> 目录（OUT_DIR 向上三级）
fn deploy_dir() -> Option<PathBuf> {
    let out_dir = std::env::var("OUT_DIR").ok()?;
    Path::new(&out_dir)
        .parent()?
        .parent()?
        .parent()
        .map(Path::to_path_buf)
}

fn set_build_metadata() {
    let git_commit = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    let build_version = fs::read_to_string("VERSION")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| git_commit.clone());

    let build_timestamp = Utc::now().to_rfc3339();

    println!("cargo:rustc-env=APP_BUILD_VERSION={}", build_version);
    println!("cargo:rustc-env=APP_BUILD_COMMIT={}", git_commit);
    println!("cargo:rustc-env=APP_BUILD_TIMESTAMP={}", build_timestamp);
}

// 复制配置文件
fn copy_config_files(out_dir: &Path) -> io::Result<()> {
    if Path::new("config.example.yaml").exists() {
        fs::copy("config.example.yaml", out_dir.join("config.example.yaml"))?;
        println!("cargo:info=已复制示例配置文件");
    }

    Ok(())
}
