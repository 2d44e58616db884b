use std::fmt;
use std::io;

use vesync_hijack::cloud::CloudError;
use vesync_hijack::error::{ConfigError, HijackError};
use vesync_hijack::smartconfig::SmartConfigError;

// sysexits-style codes.
pub const SUCCESS: i32 = 0;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const USAGE: i32 = 64;
pub const CONFIG: i32 = 78;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::AddrInUse | io::ErrorKind::AddrNotAvailable => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn config_error(context: &str, err: ConfigError) -> CliError {
    let code = match err {
        ConfigError::MissingPassphrase | ConfigError::InvalidBssid(_) => USAGE,
        _ => CONFIG,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn hijack_error(context: &str, err: HijackError) -> CliError {
    match err {
        HijackError::Config(err) => config_error(context, err),
        HijackError::SmartConfig(SmartConfigError::Bind { addr, source })
        | HijackError::Cloud(CloudError::Bind { addr, source }) => {
            io_error(&format!("{context}: failed to bind {addr}"), source)
        }
        HijackError::SmartConfig(err @ SmartConfigError::PayloadTooLong { .. }) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        HijackError::SmartConfig(SmartConfigError::Io(source))
        | HijackError::Cloud(CloudError::Io(source))
        | HijackError::Io(source) => io_error(context, source),
        HijackError::Device(err) => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}
