use std::fs::{self, File};
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::error::StagingError;

const UNZIPPED_DIR: &str = "unzipped";
const STREAM_MARKERS: [&str; 3] = ["eda", "temp", "acc"];

/// Directory a zip is extracted into: `<grandparent>/unzipped/<stem>`.
///
/// The grandparent falls back to the parent, then to `.`.
pub fn extraction_root(zip_path: &Path) -> PathBuf {
    let base = zip_path
        .parent()
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .or_else(|| zip_path.parent().filter(|p| !p.as_os_str().is_empty()))
        .unwrap_or_else(|| Path::new("."));
    let stem = zip_path.file_stem().unwrap_or_default();
    base.join(UNZIPPED_DIR).join(stem)
}

/// Extract `zip_path` and return every sensor CSV inside it, sorted.
pub fn unzip_walk(zip_path: &Path) -> Result<Vec<PathBuf>, StagingError> {
    let target = extraction_root(zip_path);
    fs::create_dir_all(&target).map_err(StagingError::io(&target))?;

    let file = File::open(zip_path).map_err(StagingError::io(zip_path))?;
    let mut archive = ZipArchive::new(file)?;
    tracing::info!(
        zip = %zip_path.display(),
        entries = archive.len(),
        target = %target.display(),
        "extracting"
    );
    archive.extract(&target)?;

    let mut found = Vec::new();
    walk_csvs(&target, &mut found)?;
    found.sort();
    tracing::debug!(files = found.len(), "sensor csvs found");
    Ok(found)
}

/// Remove what [`unzip_walk`] extracted for `zip_path`.
pub fn remove_unzipped(zip_path: &Path) -> Result<(), StagingError> {
    let target = extraction_root(zip_path);
    if target.exists() {
        fs::remove_dir_all(&target).map_err(StagingError::io(&target))?;
        tracing::info!(path = %target.display(), "removed extracted files");
    }
    Ok(())
}

fn walk_csvs(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), StagingError> {
    for entry in fs::read_dir(dir).map_err(StagingError::io(dir))? {
        let path = entry.map_err(StagingError::io(dir))?.path();
        if path.is_dir() {
            walk_csvs(&path, out)?;
        } else if is_sensor_csv(&path) {
            out.push(path);
        }
    }
    Ok(())
}

fn is_sensor_csv(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(".csv") && STREAM_MARKERS.iter().any(|m| name.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn make_zip(path: &Path, entries: &[(&str, &str)]) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        for (name, body) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_extraction_root() {
        assert_eq!(
            extraction_root(Path::new("/data/raw/Sensors_U02.zip")),
            PathBuf::from("/data/unzipped/Sensors_U02")
        );
        assert_eq!(
            extraction_root(Path::new("raw/x.zip")),
            PathBuf::from("raw/unzipped/x")
        );
        assert_eq!(extraction_root(Path::new("x.zip")), PathBuf::from("./unzipped/x"));
    }

    #[test]
    fn test_unzip_walk_and_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("raw");
        fs::create_dir_all(&raw).unwrap();
        let zip_path = raw.join("Sensors_U02_ALLSITES_20190801_20190831.zip");
        make_zip(
            &zip_path,
            &[
                ("U02/FC/096/2M4Y4111FK/temp.csv", "t,v\n1,2\n"),
                ("U02/FC/096/2M4Y4111FK/eda.csv", "t,v\n1,2\n"),
                ("U02/FC/096/2M4Y4111FK/bvp.csv", "t,v\n1,2\n"),
                ("U02/FC/096/2M4Y4111FK/notes.txt", "acc"),
            ],
        );

        let found = unzip_walk(&zip_path).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["eda.csv", "temp.csv"]);
        assert!(found[0].starts_with(dir.path().join("unzipped")));

        remove_unzipped(&zip_path).unwrap();
        assert!(!found[0].exists());
        assert!(zip_path.exists());
    }

    #[test]
    fn test_not_a_zip() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("raw").join("bogus.zip");
        fs::create_dir_all(bogus.parent().unwrap()).unwrap();
        fs::write(&bogus, "not a zip").unwrap();
        assert!(matches!(unzip_walk(&bogus), Err(StagingError::Archive(_))));
    }
}
