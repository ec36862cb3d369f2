use std::sync::Arc;

use super::personalize_use_case::{PersonalizeUseCase, PipelineRun};

const DEFAULT_CHANNEL_CAPACITY: usize = 8;

/// One photo to personalize against the batch template.
pub struct BatchJob {
    pub name: String,
    pub source: Vec<u8>,
}

#[derive(Debug)]
pub struct BatchOutcome {
    pub name: String,
    pub run: PipelineRun,
}

/// Runs many personalization requests against one template on a pool of
/// worker threads.
///
/// Layout: `feeder → [worker × N] → collector`
///
/// Workers share the use case (and through it the model handle); each
/// request owns its own decoded images, so no pixel buffer is shared.
pub struct BatchExecutor {
    use_case: Arc<PersonalizeUseCase>,
    template: Arc<[u8]>,
    workers: usize,
    channel_capacity: usize,
}

impl BatchExecutor {
    pub fn new(use_case: Arc<PersonalizeUseCase>, template: Vec<u8>, workers: usize) -> Self {
        Self {
            use_case,
            template: template.into(),
            workers: workers.max(1),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Outcomes come back in job order.
    pub fn run(&self, jobs: Vec<BatchJob>) -> Vec<BatchOutcome> {
        let total = jobs.len();
        let (job_tx, job_rx) = crossbeam_channel::bounded::<(usize, BatchJob)>(self.channel_capacity);
        let (done_tx, done_rx) = crossbeam_channel::unbounded::<(usize, BatchOutcome)>();

        let handles: Vec<_> = (0..self.workers.min(total.max(1)))
            .map(|id| {
                spawn_worker(
                    id,
                    self.use_case.clone(),
                    self.template.clone(),
                    job_rx.clone(),
                    done_tx.clone(),
                )
            })
            .collect();
        drop(job_rx);
        drop(done_tx);

        for indexed in jobs.into_iter().enumerate() {
            if job_tx.send(indexed).is_err() {
                log::error!("All batch workers exited early");
                break;
            }
        }
        drop(job_tx);

        let mut outcomes: Vec<(usize, BatchOutcome)> = done_rx.iter().collect();
        for handle in handles {
            if handle.join().is_err() {
                log::error!("Batch worker panicked");
            }
        }

        outcomes.sort_by_key(|(i, _)| *i);
        let done = outcomes.iter().filter(|(_, o)| o.run.is_done()).count();
        log::info!("Batch finished: {done}/{total} personalized");
        outcomes.into_iter().map(|(_, o)| o).collect()
    }
}

fn spawn_worker(
    id: usize,
    use_case: Arc<PersonalizeUseCase>,
    template: Arc<[u8]>,
    job_rx: crossbeam_channel::Receiver<(usize, BatchJob)>,
    done_tx: crossbeam_channel::Sender<(usize, BatchOutcome)>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        for (index, job) in job_rx {
            log::debug!("Worker {id} processing {}", job.name);
            let run = use_case.process(&job.source, &template);
            let outcome = BatchOutcome {
                name: job.name,
                run,
            };
            if done_tx.send((index, outcome)).is_err() {
                break;
            }
        }
    })
}
