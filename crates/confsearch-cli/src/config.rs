//! Layered configuration: built-in defaults, an optional TOML file,
//! command-line flags, and `--set KEY=VALUE` overrides.

mod builder;
mod defaults;
mod file;
mod models;

pub use builder::build_config;
pub use defaults::DefaultsConfig;
pub use file::FileConfig;
pub use models::AppConfig;

/// The default configuration rendered as a TOML document.
pub fn default_config_toml() -> crate::error::Result<String> {
    FileConfig::from_defaults(&DefaultsConfig::default()).to_toml()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_toml_parses_back_to_the_same_file_config() {
        let text = default_config_toml().unwrap();
        assert!(text.contains("[search]"));
        assert!(text.contains("num-conformers = 10"));
        assert!(text.contains("[minimization]"));
        let parsed: FileConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, FileConfig::from_defaults(&DefaultsConfig::default()));
    }
}
