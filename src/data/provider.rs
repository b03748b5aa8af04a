//! Project and community registry
//!
//! A community is a family of projects sharing one metric schema. Each
//! project references one CSV file per release. On disk the layout is
//! `<root>/<community dir>/<project>/*.csv`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use super::{DataError, DataResult};

/// A named set of release files for one software system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    pub name: String,
    pub files: Vec<PathBuf>,
}

impl Project {
    pub fn new(name: impl Into<String>, files: Vec<PathBuf>) -> Self {
        Self {
            name: name.into(),
            files,
        }
    }
}

/// Immutable registry of projects, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Community {
    pub name: String,
    projects: BTreeMap<String, Project>,
}

impl Community {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            projects: BTreeMap::new(),
        }
    }

    pub fn with_project(mut self, project: Project) -> Self {
        self.projects.insert(project.name.clone(), project);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Project> {
        self.projects.get(name)
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.projects.keys().map(String::as_str)
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }
}

/// Resolves a community name to its projects and their files.
pub trait DatasetProvider {
    fn community(&self, name: &str) -> DataResult<Community>;
}

/// A community shipped with a fixed project list.
#[derive(Debug, Clone, Copy)]
pub struct KnownCommunity {
    /// Name used on the command line
    pub name: &'static str,
    /// Directory under the data root
    pub dir: &'static str,
    pub projects: &'static [&'static str],
}

pub const KNOWN_COMMUNITIES: &[KnownCommunity] = &[
    KnownCommunity {
        name: "Apache",
        dir: "Jureczko",
        projects: &[
            "ant", "camel", "ivy", "jedit", "log4j", "lucene", "poi", "velocity", "xalan",
            "xerces",
        ],
    },
    KnownCommunity {
        name: "AEEEM",
        dir: "AEEEM",
        projects: &["EQ", "JDT", "LC", "ML", "PDE"],
    },
    KnownCommunity {
        name: "RELINK",
        dir: "Relink",
        projects: &["Apache", "Safe", "Zxing"],
    },
    KnownCommunity {
        name: "NASA",
        dir: "mccabe",
        projects: &["cm", "jm", "kc", "mc", "mw"],
    },
];

impl KnownCommunity {
    /// Case-insensitive lookup by community name.
    pub fn find(name: &str) -> Option<&'static KnownCommunity> {
        KNOWN_COMMUNITIES
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// Discovers communities under a data root directory.
#[derive(Debug, Clone)]
pub struct DirectoryProvider {
    root: PathBuf,
}

impl DirectoryProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding a known community's projects
    pub fn community_dir(&self, known: &KnownCommunity) -> PathBuf {
        self.root.join(known.dir)
    }

    fn project(&self, dir: &Path, name: &str) -> DataResult<Project> {
        let files = csv_files(&dir.join(name))?;
        if files.is_empty() {
            return Err(DataError::NoFiles {
                project: name.to_string(),
            });
        }
        debug!("Project {}: {} release files", name, files.len());
        Ok(Project::new(name, files))
    }
}

impl DatasetProvider for DirectoryProvider {
    fn community(&self, name: &str) -> DataResult<Community> {
        if let Some(known) = KnownCommunity::find(name) {
            let dir = self.community_dir(known);
            let mut community = Community::new(known.name);
            for project in known.projects {
                community = community.with_project(self.project(&dir, project)?);
            }
            return Ok(community);
        }

        // Unlisted community: every sub-directory is a project
        let dir = self.root.join(name);
        if !dir.is_dir() {
            return Err(DataError::UnknownCommunity {
                name: name.to_string(),
                known: KNOWN_COMMUNITIES
                    .iter()
                    .map(|c| c.name)
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }

        let entries = std::fs::read_dir(&dir).map_err(|source| DataError::Io {
            path: dir.clone(),
            source,
        })?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| DataError::Io {
                path: dir.clone(),
                source,
            })?;
            if entry.path().is_dir() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();

        let mut community = Community::new(name);
        for project in &names {
            community = community.with_project(self.project(&dir, project)?);
        }
        Ok(community)
    }
}

/// `*.csv` files directly inside `dir`, sorted by path.
fn csv_files(dir: &Path) -> DataResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(DataError::MissingFile {
            path: dir.to_path_buf(),
        });
    }
    let entries = std::fs::read_dir(dir).map_err(|source| DataError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|source| DataError::Io {
                path: dir.to_path_buf(),
                source,
            })?
            .path();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if path.is_file() && is_csv {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "x,bug\n1,0\n").unwrap();
    }

    #[test]
    fn test_known_community_lookup_is_case_insensitive() {
        assert_eq!(KnownCommunity::find("aeeem").unwrap().dir, "AEEEM");
        assert_eq!(KnownCommunity::find("apache").unwrap().dir, "Jureczko");
        assert!(KnownCommunity::find("eclipse").is_none());
    }

    #[test]
    fn test_known_community_layout() {
        let root = tempfile::tempdir().unwrap();
        for p in ["Apache", "Safe", "Zxing"] {
            touch(&root.path().join("Relink").join(p).join("v1.csv"));
        }
        touch(&root.path().join("Relink/Safe/v2.csv"));
        std::fs::write(root.path().join("Relink/Safe/notes.txt"), "skip").unwrap();

        let provider = DirectoryProvider::new(root.path());
        let community = provider.community("relink").unwrap();
        assert_eq!(community.name, "RELINK");
        assert_eq!(community.len(), 3);
        let safe = community.get("Safe").unwrap();
        assert_eq!(safe.files.len(), 2);
        assert!(safe.files[0].ends_with("v1.csv"));
    }

    #[test]
    fn test_missing_project_directory_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("Relink/Apache/v1.csv"));
        let provider = DirectoryProvider::new(root.path());
        let err = provider.community("RELINK").unwrap_err();
        assert!(err.to_string().contains("Safe"));
    }

    #[test]
    fn test_unlisted_community_discovers_projects() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("mine/beta/r1.csv"));
        touch(&root.path().join("mine/alpha/r1.csv"));
        let provider = DirectoryProvider::new(root.path());
        let community = provider.community("mine").unwrap();
        let names: Vec<&str> = community.names().collect();
        assert_eq!(names, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_unknown_community() {
        let root = tempfile::tempdir().unwrap();
        let provider = DirectoryProvider::new(root.path());
        assert!(matches!(
            provider.community("nope"),
            Err(DataError::UnknownCommunity { .. })
        ));
    }
}
