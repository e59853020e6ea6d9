//! Command-line probe for the database RPC transport.
//!
//! Loads [`Config`], installs telemetry, connects over WebSocket, signs in and
//! selects a database when configured, prints the server version, pings, and
//! disconnects. Output streams are injected so tests can capture them.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use ortho_config::OrthoConfig;

use surreal_config::Config;
use surreal_rpc::{Connection, DatabaseIdentifier, SurrealClient};
use surreal_ws::WsConnection;
use tracing::info;

mod errors;
pub mod telemetry;


use errors::AppError;

/// Log target for probe progress.
const CLI_TARGET: &str = "surreal_cli";

/// Loads configuration for the probe.
pub(crate) trait ConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

/// Resolves configuration through `ortho_config` layering.
pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

/// Runs the probe with the given arguments and output streams.
///
/// Returns [`ExitCode::SUCCESS`] when every step succeeds. Otherwise the
/// failure is written to `stderr` and [`ExitCode::FAILURE`] is returned.
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let args: Vec<OsString> = args.into_iter().collect();
    match execute(&OrthoConfigLoader, &args, stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(stderr, "surreal-rpc: {error}");
            ExitCode::FAILURE
        }
    }
}

fn execute<L, W>(loader: &L, args: &[OsString], stdout: &mut W) -> Result<(), AppError>
where
    L: ConfigLoader,
    W: Write,
{
    let config = loader.load(args)?;
    telemetry::initialise(&config)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(AppError::Runtime)?;
    let connection = WsConnection::new(runtime.handle().clone());
    runtime.block_on(probe(connection, &config, stdout))
}

/// Drives one probe session over `connection`.
pub(crate) async fn probe<C, W>(
    connection: C,
    config: &Config,
    stdout: &mut W,
) -> Result<(), AppError>
where
    C: Connection,
    W: Write,
{
    let url = config.endpoint().url()?;
    let client = SurrealClient::connect(connection, &url, None)
        .await
        .map_err(|source| AppError::Connect {
            endpoint: url.to_string(),
            source,
        })?;
    info!(target: CLI_TARGET, %url, "connected");

    if let Some((username, password)) = config.credentials() {
        client
            .signin(username, password)
            .await
            .map_err(AppError::request("signin"))?;
        info!(target: CLI_TARGET, username, "signed in");
    }

    if let Some((namespace, database)) = config.database_selection() {
        client
            .use_database(DatabaseIdentifier::new(namespace, database))
            .await
            .map_err(AppError::request("use"))?;
        info!(target: CLI_TARGET, namespace, database, "selected database");
    }

    let version = client.version().await.map_err(AppError::request("version"))?;
    writeln!(stdout, "{version}").map_err(AppError::Output)?;

    client.ping().await.map_err(AppError::request("ping"))?;
    client.disconnect();
    Ok(())
}
