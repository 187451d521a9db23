use std::path::{Path, PathBuf};

/// 获取隔离环境中的 Python 解释器路径
///
/// # 参数
///
/// * `venv_dir` - 隔离环境目录
///
/// # 返回值
///
/// Unix 下为 `<venv>/bin/python`，Windows 下为 `<venv>\Scripts\python.exe`
///
/// # 示例
///
/// ```
/// use wasabi_bot_launcher::utils::path::venv_interpreter;
/// use std::path::Path;
///
/// let python = venv_interpreter(Path::new("venv"));
/// assert!(python.starts_with("venv"));
/// ```
pub fn venv_interpreter(venv_dir: &Path) -> PathBuf {
    if cfg!(windows) {
        venv_dir.join("Scripts").join("python.exe")
    } else {
        venv_dir.join("bin").join("python")
    }
}

/// 相对路径基于项目目录解析，绝对路径保持不变
pub fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
