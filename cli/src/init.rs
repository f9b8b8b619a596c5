use anyhow::Result;
use console::style;
use mcphub_core::config::{self, Config, ToolConfig};
use mcphub_core::tools::{DOCS_TOOL, MEMORY_TOOL, SCAN_TOOL, SEARCH_TOOL, UI_GRADE_TOOL};
use std::path::Path;

/// Starter config with every tool's settings spelled out at their defaults.
pub fn default_config() -> Config {
    Config::default()
        .with_tool(
            DOCS_TOOL,
            ToolConfig::new()
                .with("docs_root", "./docs")
                .with("max_chars", 800),
        )
        .with_tool(
            SCAN_TOOL,
            ToolConfig::new()
                .with("command", "semgrep")
                .with("timeout_secs", 60),
        )
        .with_tool(
            MEMORY_TOOL,
            ToolConfig::new().with("store_path", mcphub_core::memory::DEFAULT_STORE_PATH),
        )
        .with_tool(
            SEARCH_TOOL,
            ToolConfig::new()
                .with("endpoint", "https://api.exa.ai/search")
                .with("num_results", 5)
                .with("timeout_secs", 30),
        )
        .with_tool(
            UI_GRADE_TOOL,
            ToolConfig::new()
                .with("pass_threshold", 90)
                .with("timeout_secs", 120),
        )
}

pub fn run_init(path: Option<&Path>, force: bool) -> Result<()> {
    let target = match path {
        Some(path) => path.to_path_buf(),
        None => {
            config::ensure_mcphub_dir()?;
            config::get_config_path()
        }
    };

    if target.exists() && !force {
        println!(
            "{} Config already exists at {} (use --force to overwrite)",
            style("!").yellow(),
            target.display()
        );
        return Ok(());
    }

    config::save_config_to(&default_config(), &target)?;
    println!(
        "{} Wrote config to {}",
        style("✓").green().bold(),
        target.display()
    );
    println!("  Set EXA_API_KEY to enable live web search.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn init_writes_loadable_config() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");

        run_init(Some(path.as_path()), false).unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.tool(SCAN_TOOL).get_str("command"), Some("semgrep"));
        assert_eq!(config.tool(DOCS_TOOL).u64_or("max_chars", 0), 800);
    }

    #[test]
    fn init_keeps_existing_config() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[tools.REF]\ndocs_root = \"mine\"\n").unwrap();

        run_init(Some(path.as_path()), false).unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.tool(DOCS_TOOL).get_str("docs_root"), Some("mine"));
    }
}
