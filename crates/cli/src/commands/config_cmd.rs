//! `codeloop config`: Configuration management commands.

use codeloop_config::AppConfig;

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   Config parsed successfully");

            let mut warnings = Vec::new();

            if config.agent.authorized_imports.is_empty() {
                warnings.push("No authorized imports; generated code cannot import anything");
            }

            if config.streaming.event_interval_ms >= config.streaming.poll_interval_ms {
                warnings.push("streaming.event_interval_ms is not below poll_interval_ms");
            }

            if config.streaming.burst_threshold == 0 {
                warnings.push("streaming.burst_threshold = 0 disables event pacing");
            }

            if warnings.is_empty() {
                println!("   All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   warning: {w}");
                }
            }

            println!();
            println!("   Max steps:      {}", config.agent.max_steps);
            match config.agent.planning_interval {
                Some(n) => println!("   Planning:       every {n} steps"),
                None => println!("   Planning:       off"),
            }
            println!("   Run summary:    {}", config.agent.provide_run_summary);
            println!("   Output limit:   {} chars", config.agent.max_output_chars);
            println!(
                "   Streaming:      poll {}ms, pace {}ms, burst {}",
                config.streaming.poll_interval_ms,
                config.streaming.event_interval_ms,
                config.streaming.burst_threshold
            );
        }
        Err(e) => {
            println!("   Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}

pub async fn init(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    if config_path.exists() && !force {
        println!("Config already exists: {}", config_path.display());
        println!("Use --force to overwrite it.");
        return Ok(());
    }

    std::fs::create_dir_all(&config_dir)?;
    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("Wrote default config: {}", config_path.display());
    Ok(())
}
