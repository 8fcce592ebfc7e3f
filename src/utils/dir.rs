use std::{
    env, io,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Result};

const APPLICATION_DIR_NAME: &str = "screenbreak";

fn default_application_path() -> Result<PathBuf> {
    let mut path = {
        #[cfg(windows)]
        {
            env::var("APPDATA")
                .map(PathBuf::from)
                .map_err(|_| anyhow!("APPDATA should be present on Windows"))?
        }
        #[cfg(target_os = "macos")]
        {
            env::var("HOME")
                .map(|home| PathBuf::from(home).join("Library/Application Support"))
                .map_err(|_| anyhow!("Couldn't find HOME"))?
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            env::var("XDG_STATE_HOME")
                .map(PathBuf::from)
                .or_else(|_| env::var("HOME").map(|home| PathBuf::from(home).join(".local/state")))
                .map_err(|_| anyhow!("Couldn't find neither XDG_STATE_HOME nor HOME"))?
        }
    };
    path.push(APPLICATION_DIR_NAME);
    Ok(path)
}

fn ensure_dir(path: &Path) -> Result<()> {
    match std::fs::create_dir_all(path) {
        Ok(_) => Ok(()),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(v) => Err(v.into()),
    }
}

/// Creates the directory logs are written into. `dir` overrides the platform default.
pub fn create_application_path(dir: Option<PathBuf>) -> Result<PathBuf> {
    let path = dir.map_or_else(default_application_path, Ok)?;
    ensure_dir(&path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use super::create_application_path;

    #[test]
    fn test_override_is_created() -> Result<()> {
        let root = tempdir()?;
        let target = root.path().join("nested").join("screenbreak");

        let created = create_application_path(Some(target.clone()))?;

        assert_eq!(created, target);
        assert!(target.is_dir());

        // Second call finds the directory already there.
        create_application_path(Some(target.clone()))?;
        Ok(())
    }
}
