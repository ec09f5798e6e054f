use std::env;
use std::path::Path;

const DEFAULT_READER: &str = "ZXingReader";
const DEFAULT_WORKER_NAME: &str = "barscan-decoder";
const DEFAULT_EXTENSIONS: &str = "png,jpg,jpeg,gif,bmp,tif,tiff,webp,pnm";

/// Configuration for the recognizer and the decode worker
#[derive(Debug, Clone)]
pub struct Config {
    pub reader_command: String,
    pub worker_name: String,
    pub image_extensions: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            reader_command: non_empty_var("BARSCAN_READER").unwrap_or(defaults.reader_command),
            worker_name: non_empty_var("BARSCAN_WORKER_NAME").unwrap_or(defaults.worker_name),
            image_extensions: non_empty_var("BARSCAN_EXTENSIONS")
                .map(|list| parse_extensions(&list))
                .filter(|exts| !exts.is_empty())
                .unwrap_or(defaults.image_extensions),
        }
    }

    /// Whether a directory entry should be picked up as an image
    pub fn is_image(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| self.image_extensions.iter().any(|e| *e == ext))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reader_command: DEFAULT_READER.to_string(),
            worker_name: DEFAULT_WORKER_NAME.to_string(),
            image_extensions: parse_extensions(DEFAULT_EXTENSIONS),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_extensions(list: &str) -> Vec<String> {
    list.split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.reader_command, "ZXingReader");
        assert_eq!(config.worker_name, "barscan-decoder");
        assert!(config.image_extensions.contains(&"png".to_string()));
        assert!(config.image_extensions.contains(&"pnm".to_string()));
    }

    #[test]
    fn test_parse_extensions() {
        assert_eq!(parse_extensions(" .PNG, jpg,,"), vec!["png", "jpg"]);
        assert!(parse_extensions(",").is_empty());
    }

    #[test]
    fn test_is_image() {
        let config = Config::default();
        assert!(config.is_image(Path::new("scan/Label.PNG")));
        assert!(config.is_image(Path::new("a.tiff")));
        assert!(!config.is_image(Path::new("notes.txt")));
        assert!(!config.is_image(Path::new("README")));
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        env::set_var("BARSCAN_READER", "/opt/zxing/ZXingReader");
        env::set_var("BARSCAN_WORKER_NAME", "");
        env::set_var("BARSCAN_EXTENSIONS", "png, ppm");

        let config = Config::from_env();

        env::remove_var("BARSCAN_READER");
        env::remove_var("BARSCAN_WORKER_NAME");
        env::remove_var("BARSCAN_EXTENSIONS");

        assert_eq!(config.reader_command, "/opt/zxing/ZXingReader");
        assert_eq!(config.worker_name, "barscan-decoder");
        assert_eq!(config.image_extensions, vec!["png", "ppm"]);
    }
}
