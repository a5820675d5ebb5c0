// src/engine.rs
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use crate::drivers::{AcquisitionError, ByteSource};
use crate::session::AcquisitionSession;
use crate::types::{Command, Event};
/// Commands handled per loop iteration before the next tick.
const COMMAND_BURST: usize = 10;
/// Runs `session` on its own thread until [`Command::Shutdown`], a closed
/// command channel, or a source failure. The final capture is sent as
/// [`Event::Stopped`].
pub fn spawn<S>(
    mut session: AcquisitionSession<S>,
    rx_cmd: Receiver<Command>,
    tx: Sender<Event>,
    tick_interval: Duration,
) -> JoinHandle<()>
where
    S: ByteSource + Send + 'static,
{
    thread::spawn(move || {
        tx.send(Event::Started).ok();
        log::info!("Acquisition engine started");
        'run: loop {
            // 1. commands
            for _ in 0..COMMAND_BURST {
                match rx_cmd.try_recv() {
                    Ok(Command::Shutdown) => break 'run,
                    Ok(cmd) => match session.apply(cmd.clone()) {
                        Ok(outcome) => {
                            tx.send(Event::Outcome(outcome)).ok();
                        }
                        Err(err) => {
                            log::warn!("Command {cmd:?} rejected: {err}");
                            tx.send(Event::Error(err.to_string())).ok();
                        }
                    },
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        log::info!("Command channel closed");
                        break 'run;
                    }
                }
            }
            // 2. data
            match session.tick() {
                Ok(Some(output)) => {
                    tx.send(Event::Tick(output)).ok();
                }
                Ok(None) => {}
                Err(err @ (AcquisitionError::Io(_) | AcquisitionError::Serial(_))) => {
                    log::error!("Byte source failed: {err}");
                    tx.send(Event::Error(err.to_string())).ok();
                    break 'run;
                }
                Err(err) => {
                    log::warn!("Tick failed: {err}");
                    tx.send(Event::Error(err.to_string())).ok();
                }
            }
            thread::sleep(tick_interval);
        }
        if let Err(err) = session.close() {
            log::warn!("Closing byte source failed: {err}");
        }
        log::info!("Acquisition engine stopped");
        tx.send(Event::Stopped(Box::new(session.snapshot()))).ok();
    })
}
