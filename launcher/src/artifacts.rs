//! Staging of configuration artifacts into a service's shared directory.

use crate::enclave::{Artifact, ArtifactSource, SharedPath};
use crate::Error;
use std::fs;
use std::path::Path;

/// Copies or writes one artifact into `shared_dir`, creating any needed
/// parent directories. Repeated calls overwrite the destination silently.
pub fn stage(shared_dir: &SharedPath, artifact: &Artifact) -> Result<(), Error> {
    let dst = shared_dir.local().join(&artifact.dest);
    let wrap = |source: std::io::Error| Error::Staging {
        src: artifact.describe_source(),
        dst: dst.clone(),
        source,
    };
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).map_err(wrap)?;
    }
    match &artifact.source {
        ArtifactSource::File(src) => {
            fs::copy(src, &dst).map_err(wrap)?;
        }
        ArtifactSource::Dir(src) => {
            copy_dir(src, &dst).map_err(wrap)?;
        }
        ArtifactSource::Content(content) => {
            fs::write(&dst, content).map_err(wrap)?;
        }
    }
    Ok(())
}

/// Stages every artifact a launch spec declares.
pub fn stage_all(shared_dir: &SharedPath, artifacts: &[Artifact]) -> Result<(), Error> {
    for artifact in artifacts {
        stage(shared_dir, artifact)?;
    }
    Ok(())
}

/// Serializes `data` as YAML into `dest` on the launcher's filesystem.
pub fn render_yaml<T: serde::Serialize>(
    document: &str,
    data: &T,
    dest: &Path,
) -> Result<(), Error> {
    let rendered = serde_yaml::to_string(data).map_err(|source| Error::Render {
        document: document.to_string(),
        source,
    })?;
    fs::write(dest, rendered)?;
    Ok(())
}

fn copy_dir(src: &Path, dst: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_shared_dir(name: &str) -> SharedPath {
        let local = std::env::temp_dir()
            .join("testnet-launcher-artifacts")
            .join(format!("{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&local);
        fs::create_dir_all(&local).unwrap();
        SharedPath::new(local, PathBuf::from("/shared"))
    }

    #[test]
    fn stages_file_content_and_directory() {
        let shared = test_shared_dir("all-sources");
        let src_file = shared.local().join("src.txt");
        fs::write(&src_file, "hello").unwrap();
        let src_dir = shared.local().join("keys");
        fs::create_dir_all(src_dir.join("tranche-0")).unwrap();
        fs::write(src_dir.join("tranche-0").join("key"), "k0").unwrap();

        stage(&shared, &Artifact::file(&src_file, "staged/copy.txt")).unwrap();
        stage(&shared, &Artifact::content("secret", "staged/jwtsecret")).unwrap();
        stage(&shared, &Artifact::dir(&src_dir, "staged/keys")).unwrap();

        assert_eq!(
            fs::read_to_string(shared.local().join("staged/copy.txt")).unwrap(),
            "hello"
        );
        assert_eq!(
            fs::read_to_string(shared.local().join("staged/jwtsecret")).unwrap(),
            "secret"
        );
        assert_eq!(
            fs::read_to_string(shared.local().join("staged/keys/tranche-0/key")).unwrap(),
            "k0"
        );
    }

    #[test]
    fn staging_overwrites_silently() {
        let shared = test_shared_dir("overwrite");
        stage(&shared, &Artifact::content("one", "out.txt")).unwrap();
        stage(&shared, &Artifact::content("two", "out.txt")).unwrap();
        assert_eq!(
            fs::read_to_string(shared.local().join("out.txt")).unwrap(),
            "two"
        );
    }

    #[test]
    fn missing_source_is_a_staging_error() {
        let shared = test_shared_dir("missing-source");
        let missing = shared.local().join("does-not-exist");
        let result = stage(&shared, &Artifact::file(&missing, "out.txt"));
        assert!(matches!(result, Err(Error::Staging { .. })));
    }

    #[test]
    fn renders_yaml_document() {
        let shared = test_shared_dir("render");
        let dest = shared.local().join("doc.yaml");
        let data = vec![("a", 1u32), ("b", 2u32)]
            .into_iter()
            .collect::<std::collections::BTreeMap<_, _>>();
        render_yaml("test document", &data, &dest).unwrap();
        let rendered = fs::read_to_string(&dest).unwrap();
        assert!(rendered.contains("a: 1"));
        assert!(rendered.contains("b: 2"));
    }
}
