//! Temporary workspaces for capture tests.
//!
//! A [`Workspace`] owns a temp directory with an output folder, room for
//! config files and, on Unix, a `bin/` directory of fake capture tools.

use std::path::{Path, PathBuf};

use image::{GrayImage, Luma};
use tempfile::TempDir;

pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Directory captures are written into (not created up front).
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.path().join("incoming")
    }

    /// Write a config file and return its path.
    pub fn write_config(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path().join(name);
        std::fs::write(&path, content).expect("Failed to write config");
        path
    }

    /// Save a uniform grey JPEG and return its path.
    pub fn frame(&self, name: &str, luma: u8) -> PathBuf {
        let path = self.path().join(name);
        GrayImage::from_pixel(64, 48, Luma([luma]))
            .save(&path)
            .expect("Failed to save frame");
        path
    }

    /// Captured images in the output directory, sorted.
    #[must_use]
    pub fn captures(&self) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(self.output_dir()) else {
            return Vec::new();
        };
        let mut found: Vec<PathBuf> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("captured_") && n.ends_with(".jpg"))
            })
            .collect();
        found.sort();
        found
    }

    /// `PATH` value with the fake tool directory first.
    #[must_use]
    pub fn path_env(&self) -> String {
        let system = std::env::var("PATH").unwrap_or_default();
        format!("{}:{system}", self.bin_dir().display())
    }

    #[must_use]
    pub fn bin_dir(&self) -> PathBuf {
        self.path().join("bin")
    }

    /// Arguments every fake tool invocation was called with, one line per call.
    #[must_use]
    pub fn tool_calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.path().join("calls.log"))
            .map(|s| s.lines().map(String::from).collect())
            .unwrap_or_default()
    }
}

#[cfg(unix)]
impl Workspace {
    /// Install an executable `name` that copies a grey frame to its `-o` path.
    pub fn install_fake_tool(&self, name: &str, luma: u8) -> PathBuf {
        let frame = self.frame(&format!("{name}_frame.jpg"), luma);
        let script = format!(
            "#!/bin/sh\n\
             echo \"$*\" >> '{calls}'\n\
             out=''\n\
             while [ $# -gt 0 ]; do\n\
             \x20 if [ \"$1\" = '-o' ]; then out=\"$2\"; shift; fi\n\
             \x20 shift\n\
             done\n\
             cp '{frame}' \"$out\"\n",
            calls = self.path().join("calls.log").display(),
            frame = frame.display(),
        );
        self.install_script(name, &script)
    }

    /// Install an executable `name` that prints to stderr and exits non-zero.
    pub fn install_failing_tool(&self, name: &str) -> PathBuf {
        self.install_script(name, "#!/bin/sh\necho 'camera not detected' >&2\nexit 1\n")
    }

    fn install_script(&self, name: &str, script: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        std::fs::create_dir_all(self.bin_dir()).expect("Failed to create bin dir");
        let path = self.bin_dir().join(name);
        std::fs::write(&path, script).expect("Failed to write fake tool");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("Failed to chmod fake tool");
        path
    }
}
