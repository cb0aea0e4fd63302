use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

/// Resolve the application home directory.
///
/// - `None` (or blank) falls back to `<platform home>/<default_subdir>`.
/// - A leading `~` is expanded against the platform home.
/// - Relative paths are made absolute against the current directory.
///
/// When `create` is set the directory is created if missing.
pub fn resolve_home_dir(
    configured: Option<String>,
    default_subdir: &str,
    create: bool,
) -> Result<PathBuf> {
    let base = platform_home()?;

    let path = match configured.as_deref().map(str::trim) {
        None | Some("") => base.join(default_subdir),
        Some(raw) => expand_tilde(raw, &base),
    };

    let path = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .context("cannot read current directory")?
            .join(path)
    };

    if create {
        std::fs::create_dir_all(&path)
            .with_context(|| format!("cannot create home dir {}", path.display()))?;
    }

    Ok(path)
}

fn platform_home() -> Result<PathBuf> {
    #[cfg(target_os = "windows")]
    let home = dirs::config_dir();
    #[cfg(not(target_os = "windows"))]
    let home = dirs::home_dir();

    home.ok_or_else(|| anyhow!("platform home directory is not available"))
}

fn expand_tilde(raw: &str, home: &Path) -> PathBuf {
    if raw == "~" {
        return home.to_path_buf();
    }
    match raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        Some(rest) => home.join(rest),
        None => PathBuf::from(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tilde_is_expanded_against_home() {
        let home = Path::new("/home/someone");
        assert_eq!(
            expand_tilde("~/.partnerapp", home),
            PathBuf::from("/home/someone/.partnerapp")
        );
        assert_eq!(expand_tilde("~", home), PathBuf::from("/home/someone"));
        assert_eq!(expand_tilde("/opt/app", home), PathBuf::from("/opt/app"));
    }

    #[test]
    fn explicit_absolute_dir_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("nested").join("home");
        let resolved = resolve_home_dir(
            Some(target.to_string_lossy().to_string()),
            ".unused",
            true,
        )
        .unwrap();
        assert_eq!(resolved, target);
        assert!(target.is_dir());
    }
}
