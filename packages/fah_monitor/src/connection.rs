//! TCP plumbing between the client's command socket and a `ClientSession`.

use anyhow::{Context, Result, bail};
use fah_client::ClientSession;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::config::{ConnectionConfig, UpdatesFileConfig};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Commands that make the client push every stream the session understands.
///
/// Update ids are arbitrary but must be unique per connection.
pub fn subscription_commands(
    password: Option<&str>,
    updates: &UpdatesFileConfig,
) -> Vec<String> {
    let mut commands = Vec::new();
    if let Some(password) = password {
        commands.push(format!("auth {password}"));
    }
    commands.extend([
        format!("updates add 0 {} $heartbeat", updates.heartbeat_secs),
        format!("updates add 1 {} $info", updates.info_secs),
        format!("updates add 2 {} $(options -a)", updates.options_secs),
        format!("updates add 3 {} $slot-info", updates.slots_secs),
        format!("updates add 4 {} $queue-info", updates.units_secs),
        "log-updates restart".to_string(),
    ]);
    commands
}

pub async fn connect(config: &ConnectionConfig) -> Result<TcpStream> {
    let address = config.address();
    let stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(&address))
        .await
        .with_context(|| format!("Timed out connecting to {address}"))?
        .with_context(|| format!("Failed to connect to {address}"))?;
    info!(%address, "Connected to client");
    Ok(stream)
}

pub async fn send_commands<W: AsyncWrite + Unpin>(writer: &mut W, commands: &[String]) -> Result<()> {
    for command in commands {
        // Never log the password.
        let shown = if command.starts_with("auth ") {
            "auth ***"
        } else {
            command.as_str()
        };
        debug!(command = shown, "Sending command");
        writer
            .write_all(format!("{command}\n").as_bytes())
            .await
            .context("Failed to write command")?;
    }
    writer.flush().await.context("Failed to flush commands")?;
    Ok(())
}

/// Feed everything read from `reader` into `session` until the peer closes.
///
/// Returns the number of bytes read. Blocks that fail to decode are logged and
/// skipped; they never end the loop.
pub async fn read_into<R: AsyncRead + Unpin>(reader: &mut R, session: &ClientSession) -> Result<u64> {
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let n = reader.read(&mut buf).await.context("Failed to read from client")?;
        if n == 0 {
            debug!(total, "Client closed the connection");
            return Ok(total);
        }
        total += n as u64;

        let report = session.update_from_bytes(&buf[..n]);
        for error in &report.errors {
            warn!(code = error.error_code(), error = %error, "Dropped block");
        }
    }
}

/// Connect, subscribe, and pump updates into `session` until the connection ends.
///
/// The connection ending is always an error: the caller decides whether to
/// start over with a fresh session.
pub async fn run(
    connection: &ConnectionConfig,
    updates: &UpdatesFileConfig,
    session: &ClientSession,
) -> Result<()> {
    let stream = connect(connection).await?;
    let (mut reader, mut writer) = stream.into_split();

    let commands = subscription_commands(connection.password.as_deref(), updates);
    send_commands(&mut writer, &commands).await?;

    let total = read_into(&mut reader, session).await?;
    bail!(
        "Connection to {} closed after {total} bytes",
        connection.address()
    )
}
