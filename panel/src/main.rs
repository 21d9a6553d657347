use clap::Parser;
use gateway_panel::app::PanelApp;
use gateway_panel::config::PanelConfig;
use gateway_panel::logging;
use panel_controller::location::PageLocation;
use panel_controller::tab::{infer_base_path_from_pathname, normalize_base_path, path_for_tab, Tab};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "gateway-panel", version, about = "Gateway control panel host")]
struct Args {
    /// Optional config file override (TOML).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Page URL the panel is opened at.
    #[arg(long)]
    url: Option<String>,

    /// Open at this tab instead of the one in the URL.
    #[arg(long)]
    tab: Option<String>,

    #[arg(long)]
    log_level: Option<String>,

    /// Log file path (stderr when unset).
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Skip the /dev-config.json probe.
    #[arg(long)]
    no_dev_config: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("gateway-panel: {err}");
            return ExitCode::from(2);
        }
    };
    let _guard = logging::init(&config.logging);

    tracing::info!(
        app = gateway_panel::APP_NAME,
        version = gateway_panel::version(),
        url = %config.page.url,
        "panel bootstrap"
    );

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            tracing::error!(error = %err, "failed to start runtime");
            return ExitCode::FAILURE;
        }
    };
    let local = tokio::task::LocalSet::new();
    let result = local.block_on(&runtime, async {
        let mut app = PanelApp::build(&config)?;
        app.run(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "panel exited with error");
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> Result<PanelConfig, String> {
    let (mut config, path) = PanelConfig::load(args.config.clone()).map_err(|err| err.to_string())?;
    if let Some(path) = path {
        eprintln!("gateway-panel: using config {}", path.display());
    }

    if let Some(url) = &args.url {
        config.page.url = url.clone();
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if let Some(file) = &args.log_file {
        config.logging.file = Some(file.clone());
    }
    if args.no_dev_config {
        config.dev_config.enabled = false;
    }
    config.validate().map_err(|err| err.to_string())?;

    if let Some(name) = &args.tab {
        let tab = Tab::from_name(name).ok_or_else(|| format!("unknown tab '{name}'"))?;
        config.page.url = url_for_tab(&config, tab)?;
    }
    Ok(config)
}

/// Rewrite the page URL so it points at `tab`, keeping the query string.
fn url_for_tab(config: &PanelConfig, tab: Tab) -> Result<String, String> {
    let location = PageLocation::parse(&config.page.url).map_err(|err| err.to_string())?;
    let base = match &config.page.base_path {
        Some(base) => normalize_base_path(base),
        None => infer_base_path_from_pathname(location.pathname()),
    };
    Ok(location.with_pathname(&path_for_tab(tab, &base)).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_flag_keeps_base_and_query() {
        let mut config = PanelConfig::default();
        config.page.url = "http://h/ui/chat?session=abc".to_string();
        let url = url_for_tab(&config, Tab::Logs).expect("url");
        assert_eq!(url, "http://h/ui/logs?session=abc");
    }

    #[test]
    fn explicit_base_path_wins() {
        let mut config = PanelConfig::default();
        config.page.url = "http://h/".to_string();
        config.page.base_path = Some("console/".to_string());
        let url = url_for_tab(&config, Tab::Nodes).expect("url");
        assert_eq!(url, "http://h/console/nodes");
    }
}
