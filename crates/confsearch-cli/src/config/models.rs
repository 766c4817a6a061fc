use confsearch::engine::config as core_config;
use std::path::PathBuf;

pub struct AppConfig {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub core_config: core_config::SearchConfig,
}
