use anyhow::Result;
use autoapply_cli::AppConfig;
use std::path::Path;

pub async fn cmd_info(config: &AppConfig, config_path: Option<&Path>) -> Result<()> {
    println!("AutoApply System Information");
    println!("============================");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("Build Date: {}", option_env!("BUILD_DATE").unwrap_or("unknown"));
    println!("Git Commit: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!();

    println!("Configuration:");
    match config_path {
        Some(path) => println!("- File: {}", path.display()),
        None => println!("- File: (defaults)"),
    }
    println!(
        "- Polling: every {}s, up to {} jobs",
        config.scheduler.polling_interval_secs, config.scheduler.max_concurrent_instances
    );
    println!("- Workflows: {}", config.paths.workflows_dir.display());
    println!("- Forms: {}", config.paths.forms_dir.display());
    println!("- Jobs: {}", config.paths.jobs_file.display());
    if config.browser.use_saved_cookies {
        println!("- Cookies: {}", config.paths.cookies_dir.display());
    } else {
        println!("- Cookies: disabled");
    }

    let cdp = config.cdp_config();
    println!();
    println!("Browser:");
    if cdp.executable.as_os_str().is_empty() {
        println!("- Executable: not found");
    } else {
        println!("- Executable: {}", cdp.executable.display());
    }
    println!("- Headless: {}", cdp.headless);
    println!("- Sandbox: {}", if cdp.no_sandbox { "off" } else { "on" });
    println!("- Default timeout: {}ms", cdp.default_timeout_ms);

    println!();
    println!("Routes:");
    if config.routes.is_empty() {
        println!("- (none)");
    }
    for (host, workflow) in &config.routes {
        println!("- {host} -> {workflow}");
    }
    Ok(())
}
