//! `check` command: validate the config and print the effective settings.

use crate::{config::ProjectConfig, log};
use anyhow::Result;

pub fn check_config(config: &ProjectConfig) -> Result<()> {
    let source = if config.config_path.as_os_str().is_empty() {
        "defaults".to_owned()
    } else {
        config.config_path.display().to_string()
    };
    log!("check"; "config ok ({})", source);
    print!("{}", config.to_toml()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_check_defaults() {
        let config = test_parse_config("[serve]\nport = 4000");
        assert!(check_config(&config).is_ok());
    }
}
