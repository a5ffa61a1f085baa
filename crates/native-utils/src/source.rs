use std::fs;
use std::path::{Path, PathBuf};

const FRAME_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

//lists every still frame in a directory, sorted by file name so playback order is stable
pub fn list_frames(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut frames = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_frame = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if path.is_file() && is_frame {
            frames.push(path);
        }
    }
    frames.sort();
    tracing::debug!("Found {} frames in {}", frames.len(), dir.display());
    Ok(frames)
}

//the directory to use: the provided one if it holds frames, otherwise an error describing why
pub fn get_frame_source(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(anyhow::anyhow!("No frame source at {}", dir.display()));
    }
    let frames = list_frames(dir)?;
    if frames.is_empty() {
        return Err(anyhow::anyhow!("Frame source {} has no frames", dir.display()));
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn lists_only_image_files_in_order() -> anyhow::Result<()> {
        let dir = tempdir()?;
        File::create(dir.path().join("b.jpg"))?;
        File::create(dir.path().join("a.PNG"))?;
        File::create(dir.path().join("notes.txt"))?;
        fs::create_dir(dir.path().join("sub.jpg"))?;

        let frames = list_frames(dir.path())?;
        let names: Vec<_> = frames
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.PNG", "b.jpg"]);
        Ok(())
    }

    #[test]
    fn empty_or_missing_source_is_an_error() -> anyhow::Result<()> {
        let dir = tempdir()?;
        assert!(get_frame_source(dir.path()).is_err());
        assert!(get_frame_source(&dir.path().join("missing")).is_err());
        Ok(())
    }
}
