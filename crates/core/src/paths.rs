use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Paths {
    pub base: PathBuf,
}

impl Paths {
    pub fn new() -> Self {
        let base = dirs::home_dir()
            .map(|h| h.join(".figbridge"))
            .unwrap_or_else(|| PathBuf::from(".figbridge"));
        Self { base }
    }

    pub fn with_base(base: PathBuf) -> Self {
        Self { base }
    }

    pub fn config_file(&self) -> PathBuf {
        self.base.join("config.json")
    }

    pub fn workspace(&self) -> PathBuf {
        self.base.join("workspace")
    }

    pub fn media_dir(&self) -> PathBuf {
        self.workspace().join("media")
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.workspace().join("exports")
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}
