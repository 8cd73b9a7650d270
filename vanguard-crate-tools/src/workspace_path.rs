use std::path::{Path, PathBuf};

/// 统一路径管理
///
/// 所有路径基于工作区根目录（通过 `CARGO_MANIFEST_DIR` 推导），
/// 避免在 demo 和测试中硬编码相对路径。
pub struct VanguardPath {}

impl VanguardPath {
    /// 获取工作区根目录
    pub fn workspace_path() -> PathBuf {
        let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
        manifest_dir.parent().map(Path::to_path_buf).unwrap_or_else(|| manifest_dir.to_path_buf())
    }

    /// 获取 `config/` 目录下的文件路径
    pub fn config_path(filename: &str) -> PathBuf {
        Self::workspace_path().join("config").join(filename)
    }
}
