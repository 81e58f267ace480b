use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::debug;

use crate::api::{Applied, Command, Engine, EngineErrorEvent, Event};
use crate::media::{FfmpegMediaBackend, FrameDecoder, MediaProbe};
use crate::sequence::FrameSequencer;

const COMMAND_CHANNEL_CAPACITY: usize = 32;
const EVENT_CHANNEL_CAPACITY: usize = 8;

/// Sender used by the presentation layer to dispatch commands to the engine task.
pub type EngineCommandSender = mpsc::Sender<Command>;

/// Receiver used by the presentation layer to read events emitted by the engine task.
pub type EngineEventReceiver = mpsc::Receiver<Event>;

/// Spawns the production bridge that wires a FFmpeg-backed engine.
pub fn spawn_ffmpeg_bridge() -> (EngineCommandSender, EngineEventReceiver) {
    spawn_engine_bridge(Engine::with_ffmpeg())
}

/// Spawns a tokio task that owns `engine` and serves commands in order.
///
/// Preview decodes run on their own tasks. A preview is only delivered while
/// it is the newest one requested, so a slow decode for an old playhead
/// position never overwrites a newer frame. Dropping the command sender ends
/// the task and closes the event channel once pending previews finish.
///
/// Must be called from within a tokio runtime.
pub fn spawn_engine_bridge<M>(engine: Engine<M>) -> (EngineCommandSender, EngineEventReceiver)
where
    M: MediaProbe + FrameDecoder + Send + Sync + 'static,
{
    let (command_tx, command_rx) = mpsc::channel::<Command>(COMMAND_CHANNEL_CAPACITY);
    let (event_tx, event_rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAPACITY);

    tokio::spawn(run_engine(engine, command_rx, event_tx));

    (command_tx, event_rx)
}

async fn run_engine<M>(
    mut engine: Engine<M>,
    mut commands: mpsc::Receiver<Command>,
    events: mpsc::Sender<Event>,
) where
    M: MediaProbe + FrameDecoder + Send + Sync + 'static,
{
    let sequencer = Arc::new(FrameSequencer::default());
    // Held across the staleness check and the send so accepted previews
    // reach the channel in ticket order.
    let preview_events = Arc::new(Mutex::new(events.clone()));

    while let Some(command) = commands.recv().await {
        match engine.apply(command).await {
            Ok(Applied { events: emitted, preview }) => {
                for event in emitted {
                    if events.send(event).await.is_err() {
                        return;
                    }
                }
                let Some(job) = preview else {
                    continue;
                };

                let ticket = sequencer.issue();
                let decoder = engine.decoder();
                let sequencer = Arc::clone(&sequencer);
                let preview_events = Arc::clone(&preview_events);
                tokio::spawn(async move {
                    let event = job.run(decoder.as_ref()).await;
                    let sender = preview_events.lock().await;
                    if let Some(event) = sequencer.accept(ticket, event) {
                        let _ = sender.send(event).await;
                    }
                });
            }
            Err(error) => {
                debug!(%error, "command failed");
                if events
                    .send(Event::Error(EngineErrorEvent::from_error(&error)))
                    .await
                    .is_err()
                {
                    return;
                }
            }
        }
    }
}
