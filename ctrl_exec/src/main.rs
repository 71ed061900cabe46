//! Drone controller executable entry point.
//!
//! # Architecture
//!
//! The executable reads commands either from the operator's prompt or from a script given on the
//! command line, and runs them through the interpretation engine:
//!
//!     - Initialise the session, logging and parameters
//!     - Open the link to the flight controller and perception nodes
//!     - Start the SIGINT listener, which raises the operator abort
//!     - Wait for the flight controller to be ready
//!     - Run the top level frame until it exits or the operator quits

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{info, warn};
use rustyline::{error::ReadlineError, DefaultEditor};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::thread;
use structopt::StructOpt;

// Internal
use ctrl_lib::{
    console::{Console, EchoStyle, StdConsole, HELP},
    controller::{Controller, MotorOutputs},
    data_store::{DataStore, Signals},
    gpio::SysfsGpio,
    interp::{self, Frame, FrameMode, InterpError},
    link::ZmqLink,
    params::CtrlExecParams,
    sync::{self, SystemClock},
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    script::{Cursor, DirScriptStore, LineSource},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const PROMPT: &str = "> ";

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "ctrl_exec", about = "Drone flight command interpreter")]
struct Opt {
    /// Script to run instead of the operator prompt
    #[structopt(parse(from_os_str))]
    script: Option<PathBuf>,

    /// Executable parameter file, relative to the params directory
    #[structopt(long, default_value = "ctrl_exec.toml")]
    params: String,
}

/// Lines typed at the operator prompt.
struct ReplSource {
    editor: Rc<RefCell<DefaultEditor>>,
    signals: Signals,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("ctrl_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    info!("Drone Controller Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params: CtrlExecParams =
        util::params::load(&opt.params).wrap_err("Could not load exec params")?;

    let mut ds = DataStore {
        param_file: Some(
            util::params::param_file_path(&params.flight_param_file)
                .wrap_err("Could not resolve the flight parameter file")?,
        ),
        timing: params.timing,
        ..Default::default()
    };

    // A missing flight parameter file isn't fatal, every register starts at zero
    ds.reload_params();

    info!("Exec parameters loaded");

    // ---- INITIALISE COLLABORATORS ----

    let zmq_ctx = comms_if::net::zmq::Context::new();
    let link = ZmqLink::new(&zmq_ctx, &params.net).wrap_err("Failed to open the flight link")?;
    info!("Flight link open");

    let scripts = DirScriptStore::new(
        host::resolve_from_root(&params.scripts.basic_dir)
            .wrap_err("Could not resolve the basic script directory")?,
        host::resolve_from_root(&params.scripts.layered_dir)
            .wrap_err("Could not resolve the layered script directory")?,
    );

    let signals = ds.signals.clone();
    spawn_sigint_listener(signals.clone()).wrap_err("Failed to start the SIGINT listener")?;

    let mut ctl = Controller {
        ds,
        link: Box::new(link),
        actuator: Box::new(SysfsGpio::new(params.gpio.root.clone())),
        clock: Box::new(SystemClock),
        console: Box::new(StdConsole),
        scripts: Box::new(scripts),
        outputs: MotorOutputs::from(&params.gpio),
        max_depth: params.interp.max_depth,
        depth: 0,
    };

    // ---- WAIT FOR THE FLIGHT CONTROLLER ----

    ctl.console.show(HELP);
    sync::wait_ready(&mut ctl);
    ctl.console.clear();
    ctl.console.show(HELP);

    // ---- MAIN LOOP ----

    let editor = Rc::new(RefCell::new(
        DefaultEditor::new().wrap_err("Failed to create the line editor")?,
    ));

    let root = match opt.script {
        Some(ref path) => {
            info!("Running script {:?}", path);
            let text = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("Failed to read script {:?}", path))?;
            Frame::script(0, &text)
        }
        None => {
            if editor.borrow_mut().load_history(&session.history_path).is_err() {
                info!("No prompt history found");
            }

            Frame::new(
                0,
                FrameMode::Interactive,
                EchoStyle::Verbose,
                Cursor::new(Box::new(ReplSource {
                    editor: editor.clone(),
                    signals,
                })),
            )
        }
    };

    let quit = match interp::run(&mut ctl, root) {
        Ok(ok) => {
            info!("Top level frame ended (success: {})", ok);
            None
        }
        Err(e @ InterpError::Quit) => {
            ctl.console.clear();
            ctl.console.show("bye.");
            Some(e)
        }
    };

    // ---- SHUTDOWN ----

    if opt.script.is_none() {
        if let Err(e) = editor.borrow_mut().save_history(&session.history_path) {
            warn!("Could not save the prompt history: {}", e);
        }
    }

    session.exit();

    // Quitting is the one way out with a failure code
    if let Some(e) = quit {
        drop(ctl);
        std::process::exit(e.exit_code());
    }

    Ok(())
}

/// Raise the operator abort every time SIGINT is received.
fn spawn_sigint_listener(signals: Signals) -> std::io::Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    thread::Builder::new()
        .name("sigint".into())
        .spawn(move || {
            rt.block_on(async move {
                loop {
                    match tokio::signal::ctrl_c().await {
                        Ok(()) => {
                            warn!("Interrupted!");
                            signals.raise_abort();
                        }
                        Err(e) => {
                            warn!("Stopped listening for SIGINT: {}", e);
                            break;
                        }
                    }
                }
            })
        })?;

    Ok(())
}

impl LineSource for ReplSource {
    fn next_line(&mut self) -> Option<String> {
        let mut editor = self.editor.borrow_mut();

        match editor.readline(PROMPT) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    editor.add_history_entry(line.as_str()).ok();
                }
                Some(line)
            }
            // Ctrl-C at the prompt is an operator abort
            Err(ReadlineError::Interrupted) => {
                self.signals.raise_abort();
                None
            }
            Err(ReadlineError::Eof) => None,
            Err(e) => {
                warn!("Could not read from the prompt: {}", e);
                None
            }
        }
    }
}
