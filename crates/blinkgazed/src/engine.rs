use blinkgaze_core::{Frame, FramePipeline, LandmarkSource, MetricsError, MetricsRecord};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Metrics(#[from] MetricsError),
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Messages sent from the transport to the engine thread.
enum EngineRequest {
    Process {
        frame: Frame,
        fps: f64,
        reply: oneshot::Sender<Result<MetricsRecord, MetricsError>>,
    },
}

/// Clone-safe handle to the engine thread.
///
/// All clones feed the same queue, so frames are processed strictly one at
/// a time in arrival order.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Run one frame through landmark detection and the metrics engine.
    pub async fn process(&self, frame: Frame, fps: f64) -> Result<MetricsRecord, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Process {
                frame,
                fps,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        let result = reply_rx.await.map_err(|_| EngineError::ChannelClosed)?;
        Ok(result?)
    }
}

/// Move the pipeline onto a dedicated OS thread and return a handle to it.
///
/// Landmark inference is blocking, so it stays off the async runtime. The
/// thread exits once every handle has been dropped.
pub fn spawn_engine<S>(
    mut pipeline: FramePipeline<S>,
    queue_depth: usize,
) -> Result<EngineHandle, EngineError>
where
    S: LandmarkSource + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(queue_depth.max(1));

    std::thread::Builder::new()
        .name("blinkgaze-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Process { frame, fps, reply } => {
                        let result = pipeline.process(&frame, fps);
                        if let Err(e) = &result {
                            tracing::warn!(error = %e, "frame processing failed");
                        }
                        let _ = reply.send(result);
                    }
                }
            }
            tracing::info!(
                frames = pipeline.engine().frames_observed(),
                blinks = pipeline.engine().total_blinks(),
                "engine thread exiting"
            );
        })
        .map_err(EngineError::Spawn)?;

    Ok(EngineHandle { tx })
}
