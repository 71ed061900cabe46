//! # Flight Link
//!
//! The link publishes flight commands to the flight controller and collects the telemetry sent
//! back by the flight controller and the perception nodes.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    flight_cmd::FlightCmd,
    net::{open_socket, zmq, NetParams, SocketError, SocketOptions},
    telem::TelemMsg,
};
use log::{error, info, warn};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc::{self, Receiver, Sender},
    Arc,
};
use std::thread::{self, JoinHandle};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Transport between the controller and the rest of the system.
pub trait Link {
    /// Publish a command. Nothing is awaited from the flight controller.
    fn publish(&mut self, cmd: &FlightCmd) -> Result<(), LinkError>;

    /// Get every telemetry message received since the last poll.
    fn poll(&mut self) -> Vec<TelemMsg>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Link over zmq.
///
/// Telemetry is received on a background thread and handed over through a channel, so that
/// merging it into the data store only ever happens on the engine's thread.
pub struct ZmqLink {
    cmd_socket: zmq::Socket,
    telem_rx: Receiver<TelemMsg>,
    stop: Arc<AtomicBool>,
    telem_thread: Option<JoinHandle<()>>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Socket error: {0}")]
    SocketError(#[from] SocketError),

    #[error("Could not serialize the command: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not send the command: {0}")]
    SendError(zmq::Error),

    #[error("Could not start the telemetry thread: {0}")]
    ThreadError(std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ZmqLink {
    /// Bind the command publisher and connect to the telemetry publisher.
    ///
    /// This function will not block until the other nodes connect.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, LinkError> {
        let cmd_options = SocketOptions {
            bind: true,
            linger: 1,
            send_timeout: 10,
            ..Default::default()
        };
        let cmd_socket = open_socket(ctx, zmq::PUB, &cmd_options, &params.cmd_endpoint)?;

        let telem_options = SocketOptions {
            linger: 1,
            recv_timeout: 100,
            ..Default::default()
        };
        let telem_socket = open_socket(ctx, zmq::SUB, &telem_options, &params.telem_endpoint)?;

        let (tx, telem_rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();

        let telem_thread = thread::Builder::new()
            .name("telem_rx".into())
            .spawn(move || recv_telem(telem_socket, tx, thread_stop))
            .map_err(LinkError::ThreadError)?;

        info!(
            "Link up, publishing on {} and listening on {}",
            params.cmd_endpoint, params.telem_endpoint
        );

        Ok(Self {
            cmd_socket,
            telem_rx,
            stop,
            telem_thread: Some(telem_thread),
        })
    }
}

impl Link for ZmqLink {
    fn publish(&mut self, cmd: &FlightCmd) -> Result<(), LinkError> {
        let json = cmd.to_json().map_err(LinkError::SerializationError)?;

        self.cmd_socket
            .send(json.as_str(), 0)
            .map_err(LinkError::SendError)
    }

    fn poll(&mut self) -> Vec<TelemMsg> {
        self.telem_rx.try_iter().collect()
    }
}

impl Drop for ZmqLink {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);

        if let Some(handle) = self.telem_thread.take() {
            if handle.join().is_err() {
                error!("The telemetry thread panicked");
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Receive telemetry until stopped, forwarding every valid message.
fn recv_telem(socket: zmq::Socket, tx: Sender<TelemMsg>, stop: Arc<AtomicBool>) {
    while !stop.load(Ordering::SeqCst) {
        let msg_str = match socket.recv_string(0) {
            Ok(Ok(s)) => s,
            Ok(Err(_)) => {
                warn!("Received telemetry which was not valid UTF-8");
                continue;
            }
            // No message in timeout
            Err(zmq::Error::EAGAIN) => continue,
            Err(e) => {
                error!("Telemetry receive error, stopping the telemetry thread: {}", e);
                break;
            }
        };

        match serde_json::from_str::<TelemMsg>(&msg_str) {
            Ok(msg) => {
                // The receiver is gone once the link is dropped
                if tx.send(msg).is_err() {
                    break;
                }
            }
            Err(e) => warn!("Could not parse telemetry \"{}\": {}", msg_str, e),
        }
    }
}
