use once_cell::sync::Lazy;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Deserialize, Debug, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_hrtf_dir")]
    pub hrtf_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_hrtf_dir() -> PathBuf {
    PathBuf::from("data").join("hrtf")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            hrtf_dir: default_hrtf_dir(),
            output_dir: default_output_dir(),
        }
    }
}

pub static CONFIG: Lazy<BackendConfig> = Lazy::new(|| {
    let path = PathBuf::from("config.toml");
    if let Ok(txt) = std::fs::read_to_string(&path) {
        toml::from_str(&txt).unwrap_or_default()
    } else {
        BackendConfig::default()
    }
});
