use std::process::Command;

use crate::config::AppConfig;
use crate::error::{AppError, Result};

/// Verify the configured external tools are resolvable.
///
/// A missing tool is a startup error, not a per-job error: the worker must
/// never start against an environment that cannot compress anything.
pub fn check_tools(config: &AppConfig) -> Result<()> {
    for tool in [&config.image.tool, &config.video.tool] {
        if !check_command(tool, &["-version"]) {
            return Err(AppError::MissingTool(tool.clone()));
        }
    }
    Ok(())
}

/// Check if a command is available
fn check_command(cmd: &str, args: &[&str]) -> bool {
    Command::new(cmd)
        .args(args)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_fails_the_check() {
        let mut config = AppConfig::default();
        config.image.tool = "definitely-not-a-real-tool".to_string();
        assert!(matches!(
            check_tools(&config),
            Err(AppError::MissingTool(_))
        ));
    }
}
