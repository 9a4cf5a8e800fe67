use std::path::PathBuf;

/// Per-application cache and offline directories on desktop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopDirectories {
    /// Download cache, thumbnails and write staging. May be purged by the OS.
    pub cache_dir: PathBuf,
    /// Offline copies the user asked to keep.
    pub offline_dir: PathBuf,
}

impl DesktopDirectories {
    pub fn for_app(app_name: &str) -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(app_name);

        let offline_dir = dirs::data_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".local")
                    .join("share")
            })
            .join(app_name)
            .join("offline");

        Self {
            cache_dir,
            offline_dir,
        }
    }
}
