use std::path::PathBuf;

pub fn runtime_dir() -> PathBuf {
    if let Ok(path) = std::env::var("NARRATOR_RUNTIME_DIR") {
        let candidate = PathBuf::from(path);
        if candidate.components().next().is_some() {
            return candidate;
        }
    }
    PathBuf::from("runtime")
}

/// Reads a path-valued environment variable, falling back to `default`.
pub fn path_from_env(key: &str, default: PathBuf) -> PathBuf {
    std::env::var_os(key)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or(default)
}
