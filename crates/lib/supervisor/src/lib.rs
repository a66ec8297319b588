//! Restart harness for long-running async work.
//!
//! Failed or panicked work is retried after an exponential backoff delay
//! plus jitter, until it succeeds or the sleep between attempts is cut short.

use core::future::Future;
use core::ops::ControlFlow;
use core::panic::UnwindSafe;
use core::time::Duration;
use futures_util::FutureExt;

/// The panic payload type alias.
type PanicPayload = Box<dyn core::any::Any + Send + 'static>;

/// Event sent to the notifier.
#[derive(Debug)]
pub enum SupervisorEvent<T, E> {
    /// The work is about to be invoked.
    Started,

    /// The work has completed without an error or panic.
    ///
    /// It won't be restarted.
    Done {
        /// The returned value.
        value: T,
    },

    /// The work returned an error.
    ///
    /// It may be restarted.
    Error {
        /// The error that was returned by the work future.
        error: E,

        /// The time to wait before the next attempt.
        next_retry_in: Duration,
    },

    /// The work panicked.
    ///
    /// It will be restarted.
    Panicked {
        /// The captured panic payload.
        panic_payload: PanicPayload,

        /// The time to wait before the next attempt.
        next_retry_in: Duration,
    },

    /// The retry sleep was interrupted; the work won't be restarted.
    Cancelled,
}

/// Parameters for `run`.
pub struct Params<Work, Notifier, Sleep, Jitter> {
    /// The work to run.
    pub work: Work,

    /// Notifier for events.
    pub notifier: Notifier,

    /// Sleep timer; resolves to [`ControlFlow::Break`] when interrupted.
    pub sleep: Sleep,

    /// Random extra delay added on top of every backoff delay.
    pub jitter: Jitter,

    /// The exponential backoff configuration for the retries.
    pub retries_backoff: exp_backoff::State,

    /// Reset the backoff when a failed attempt had run at least this long.
    pub reset_after: Option<Duration>,
}

/// Run the work until it succeeds or the retry sleep is interrupted.
pub async fn run<Work, WorkFut, Notifier, NotifierFut, Sleep, SleepFut, Jitter, Value, Error>(
    mut params: Params<Work, Notifier, Sleep, Jitter>,
) where
    Work: FnMut() -> WorkFut,
    WorkFut: Future<Output = Result<Value, Error>> + UnwindSafe,
    Notifier: FnMut(SupervisorEvent<Value, Error>) -> NotifierFut,
    NotifierFut: Future<Output = ()>,
    Sleep: FnMut(Duration) -> SleepFut,
    SleepFut: Future<Output = ControlFlow<()>>,
    Jitter: FnMut() -> Duration,
{
    loop {
        (params.notifier)(SupervisorEvent::Started).await;

        let started_at = std::time::Instant::now();

        // Panics inside the work future are caught and retried like errors.
        let work_future = core::panic::AssertUnwindSafe(async { (params.work)().await });
        let result = work_future.catch_unwind().await;

        if let Some(reset_after) = params.reset_after
            && started_at.elapsed() >= reset_after
        {
            params.retries_backoff.reset();
        }

        let failure = match result {
            Ok(Ok(value)) => {
                (params.notifier)(SupervisorEvent::Done { value }).await;
                return;
            }
            Ok(Err(error)) => Ok(error),
            Err(panic_payload) => Err(panic_payload),
        };

        let next_retry_in = params
            .retries_backoff
            .advance()
            .saturating_add((params.jitter)());

        let event = match failure {
            Ok(error) => SupervisorEvent::Error {
                error,
                next_retry_in,
            },
            Err(panic_payload) => SupervisorEvent::Panicked {
                panic_payload,
                next_retry_in,
            },
        };
        (params.notifier)(event).await;

        if (params.sleep)(next_retry_in).await.is_break() {
            (params.notifier)(SupervisorEvent::Cancelled).await;
            return;
        }
    }
}
