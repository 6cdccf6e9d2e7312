/*++

Licensed under the Apache-2.0 license.

File Name:

    gdb_state.rs

Abstract:

    File contains gdb_state module for the dual-core emulator.

--*/

use super::gdb_target::{GdbTarget, RunEvent};
use anyhow::Context;
use gdbstub::common::Signal;
use gdbstub::conn::{Connection, ConnectionExt};
use gdbstub::stub::MultiThreadStopReason;
use gdbstub::stub::{run_blocking, DisconnectReason, GdbStub, GdbStubError};
use gdbstub::target::Target;
use std::net::TcpListener;
#[cfg(unix)]
use std::path::PathBuf;

type GdbConnection = Box<dyn ConnectionExt<Error = std::io::Error>>;

enum GdbEventLoop {}

// The `run_blocking::BlockingEventLoop` groups together various callbacks
// the `GdbStub::run_blocking` event loop requires you to implement.
impl run_blocking::BlockingEventLoop for GdbEventLoop {
    type Target = GdbTarget;
    type Connection = GdbConnection;
    type StopReason = MultiThreadStopReason<u32>;

    // Invoked immediately after the target's `resume` method has been
    // called. Blocks until either the target reports a stop reason or new
    // data was sent over the connection.
    fn wait_for_stop_reason(
        target: &mut GdbTarget,
        conn: &mut Self::Connection,
    ) -> Result<
        run_blocking::Event<MultiThreadStopReason<u32>>,
        run_blocking::WaitForStopReasonError<
            <Self::Target as Target>::Error,
            <Self::Connection as Connection>::Error,
        >,
    > {
        let poll_incoming_data = || conn.peek().map(|b| b.is_some()).unwrap_or(true);

        match target.run(poll_incoming_data) {
            RunEvent::IncomingData => {
                let byte = conn
                    .read()
                    .map_err(run_blocking::WaitForStopReasonError::Connection)?;
                Ok(run_blocking::Event::IncomingData(byte))
            }
            RunEvent::Stopped(reason) => Ok(run_blocking::Event::TargetStopped(reason)),
        }
    }

    // Invoked when the GDB client sends a Ctrl-C interrupt.
    fn on_interrupt(
        _target: &mut GdbTarget,
    ) -> Result<Option<MultiThreadStopReason<u32>>, <GdbTarget as Target>::Error> {
        Ok(Some(MultiThreadStopReason::Signal(Signal::SIGINT)))
    }
}

/// Where the stub waits for the debugger
#[derive(Debug, Clone)]
pub enum Listen {
    /// TCP port on the loopback interface
    Tcp(u16),

    /// Unix domain socket path
    #[cfg(unix)]
    Uds(PathBuf),
}

fn accept(listen: &Listen) -> anyhow::Result<GdbConnection> {
    match listen {
        Listen::Tcp(port) => {
            let sockaddr = format!("127.0.0.1:{port}");
            log::info!("Waiting for a GDB connection on {sockaddr}...");
            let sock = TcpListener::bind(&sockaddr)
                .with_context(|| format!("Failed to listen on {sockaddr}"))?;
            let (stream, addr) = sock.accept()?;
            log::info!("Debugger connected from {addr}");
            Ok(Box::new(stream))
        }
        #[cfg(unix)]
        Listen::Uds(path) => {
            use std::os::unix::net::UnixListener;

            // A socket file left behind by an earlier run blocks `bind`
            match std::fs::remove_file(path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                    return Err(e).with_context(|| format!("Failed to remove {}", path.display()))
                }
                _ => {}
            }
            log::info!("Waiting for a GDB connection on {}...", path.display());
            let sock = UnixListener::bind(path)
                .with_context(|| format!("Failed to listen on {}", path.display()))?;
            let (stream, _) = sock.accept()?;
            log::info!("Debugger connected");
            Ok(Box::new(stream))
        }
    }
}

/// Serve one debugger session on `listen` and report how it ended
pub fn wait_for_gdb_run(
    target: &mut GdbTarget,
    listen: Listen,
) -> anyhow::Result<DisconnectReason> {
    let connection = accept(&listen)?;

    // Instantiate GdbStub
    let gdb = GdbStub::new(connection);

    // Execute GDB until a disconnect event
    let reason = match gdb.run_blocking::<GdbEventLoop>(target) {
        Ok(reason) => reason,
        Err(GdbStubError::TargetError(e)) => {
            anyhow::bail!("target encountered a fatal error: {e}")
        }
        Err(e) => anyhow::bail!("gdbstub encountered a fatal error: {e}"),
    };

    match reason {
        DisconnectReason::Disconnect => log::info!("Client disconnected"),
        DisconnectReason::TargetExited(code) => log::info!("Target exited with code {code}"),
        DisconnectReason::TargetTerminated(sig) => {
            log::info!("Target terminated with signal {sig}")
        }
        DisconnectReason::Kill => log::info!("GDB sent a kill command"),
    }

    Ok(reason)
}
