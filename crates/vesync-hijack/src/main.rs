mod exit;
mod logging;

use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use vesync_hijack::network::list_interfaces;
use vesync_hijack::orchestrator::cancel_on_ctrl_c;
use vesync_hijack::{resolve_credentials, HijackConfig, NetworkOptions, Orchestrator, SystemWifi};

use crate::exit::{config_error, hijack_error, io_error, CliResult, SUCCESS};
use crate::logging::{init_logging, LogFormat, LogLevel};

#[derive(Parser, Debug)]
#[command(
    name = "vesync-hijack",
    version,
    about = "Provision a VeSync smart plug onto our network and flash it with our firmware"
)]
struct Cli {
    /// Local interface name or IPv4 address to provision from.
    #[arg(short, long, value_name = "IFACE|ADDR", env = "VESYNC_HIJACK_IP")]
    ip: Option<String>,

    /// WiFi SSID. Discovered from the OS when omitted (macOS only).
    #[arg(short, long, env = "VESYNC_HIJACK_SSID")]
    ssid: Option<String>,

    /// Access point BSSID (xx:xx:xx:xx:xx:xx).
    #[arg(short, long, env = "VESYNC_HIJACK_BSSID")]
    bssid: Option<String>,

    /// WiFi passphrase.
    #[arg(short, long, env = "VESYNC_HIJACK_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Configure this device directly instead of broadcasting.
    #[arg(short, long, value_name = "ADDR")]
    device: Option<IpAddr>,

    /// HTTP and WebSocket port.
    #[arg(long, value_name = "PORT")]
    http_port: Option<u16>,

    /// Directory firmware images are served from.
    #[arg(long, value_name = "DIR")]
    assets: Option<PathBuf>,

    /// JSON file overriding ports, paths and broadcast timing.
    #[arg(long, value_name = "FILE", env = "VESYNC_HIJACK_CONFIG")]
    config: Option<PathBuf>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,
}

impl Cli {
    fn hijack_config(&self) -> CliResult<HijackConfig> {
        let mut config = match &self.config {
            Some(path) => HijackConfig::load(path).map_err(|err| config_error("config", err))?,
            None => HijackConfig::default(),
        };
        if let Some(port) = self.http_port {
            config.http_port = port;
        }
        if let Some(assets) = &self.assets {
            config.assets_dir = assets.clone();
        }
        Ok(config)
    }

    fn network_options(&self) -> NetworkOptions {
        NetworkOptions {
            ip: self.ip.clone(),
            ssid: self.ssid.clone(),
            bssid: self.bssid.clone(),
            password: self.password.clone(),
            direct_device: self.device.is_some(),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

fn run(cli: Cli) -> CliResult<i32> {
    let config = cli.hijack_config()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("failed to start runtime", err))?;

    runtime.block_on(async move {
        let interfaces =
            list_interfaces().map_err(|err| io_error("failed to list interfaces", err))?;
        let credentials = resolve_credentials(&cli.network_options(), &interfaces, &SystemWifi)
            .await
            .map_err(|err| config_error("startup", err))?;

        let mut orchestrator = Orchestrator::new(config, credentials);
        if let Some(device) = cli.device {
            orchestrator = orchestrator.with_device(device);
        }

        let cancel = CancellationToken::new();
        cancel_on_ctrl_c(cancel.clone());
        orchestrator
            .run(cancel)
            .await
            .map_err(|err| hijack_error("takeover failed", err))?;
        Ok(SUCCESS)
    })
}
