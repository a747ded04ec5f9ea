//! Per-run working directory.
//!
//! ```text
//! <work_root>/<timestamp>/
//!     field/            solver working directory (reports, mesh check)
//!     field/<room>/     end-of-run case+data checkpoints
//!     results/          exchange series, trajectory, summary plot
//! ```

use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

#[derive(Debug, Clone)]
pub struct RunWorkspace {
    root: PathBuf,
    field_dir: PathBuf,
    results_dir: PathBuf,
    rooms: Vec<String>,
}

impl RunWorkspace {
    /// Create a workspace named after the current local time.
    pub fn create(work_root: &Path, rooms: &[String]) -> AppResult<Self> {
        let stamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        Self::create_named(work_root, &stamp, rooms)
    }

    /// Create a workspace under `work_root/name`. A numeric suffix is
    /// appended when a run already used that name.
    pub fn create_named(work_root: &Path, name: &str, rooms: &[String]) -> AppResult<Self> {
        let mut root = work_root.join(name);
        let mut suffix = 1;
        while root.exists() {
            suffix += 1;
            root = work_root.join(format!("{name}_{suffix}"));
        }

        let field_dir = root.join("field");
        let results_dir = root.join("results");
        let mut dirs = vec![field_dir.clone(), results_dir.clone()];
        dirs.extend(rooms.iter().map(|room| field_dir.join(room)));
        for dir in &dirs {
            std::fs::create_dir_all(dir).map_err(|source| AppError::Workspace {
                path: dir.clone(),
                source,
            })?;
        }

        Ok(Self {
            root,
            field_dir,
            results_dir,
            rooms: rooms.to_vec(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn field_dir(&self) -> &Path {
        &self.field_dir
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    pub fn rooms(&self) -> &[String] {
        &self.rooms
    }

    /// Checkpoint directory of a declared room.
    pub fn room_dir(&self, room: &str) -> Option<PathBuf> {
        self.rooms
            .iter()
            .any(|r| r == room)
            .then(|| self.field_dir.join(room))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cs_app_ws_{}_{name}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn creates_field_room_and_results_dirs() {
        let root = temp_root("layout");
        let rooms = vec!["room1".to_string(), "room2".to_string()];
        let ws = RunWorkspace::create_named(&root, "run", &rooms).unwrap();

        assert!(ws.field_dir().is_dir());
        assert!(ws.results_dir().is_dir());
        assert!(root.join("run/field/room1").is_dir());
        assert!(root.join("run/field/room2").is_dir());
        assert_eq!(ws.room_dir("room2"), Some(root.join("run/field/room2")));
        assert_eq!(ws.room_dir("attic"), None);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn repeated_name_gets_suffix() {
        let root = temp_root("suffix");
        let a = RunWorkspace::create_named(&root, "run", &[]).unwrap();
        let b = RunWorkspace::create_named(&root, "run", &[]).unwrap();
        assert_ne!(a.root(), b.root());
        assert_eq!(b.root(), root.join("run_2"));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn timestamped_name_parses_back() {
        let root = temp_root("stamp");
        let ws = RunWorkspace::create(&root, &[]).unwrap();
        let name = ws.root().file_name().unwrap().to_string_lossy().to_string();
        let stamp = name.split('_').take(2).collect::<Vec<_>>().join("_");
        assert!(chrono::NaiveDateTime::parse_from_str(&stamp, TIMESTAMP_FORMAT).is_ok());

        let _ = std::fs::remove_dir_all(&root);
    }
}
