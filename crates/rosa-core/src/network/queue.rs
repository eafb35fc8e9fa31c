use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::debug;

use super::{Completion, Headers, HttpRequest, HttpResponse, Method, RequestId, Transport};

struct Pending {
    request: HttpRequest,
    generation: u64,
}

/// Request and response queues shared between the main thread and the worker.
///
/// The worker holds the reset lock for the whole pop, execute and push of a
/// request. A scripting reset takes the same lock, so a completion is either
/// staged before the reset discards the response queue or belongs to a
/// generation the reset has already retired.
pub struct Network {
    transport: Arc<dyn Transport>,
    requests: Mutex<VecDeque<Pending>>,
    responses: Mutex<VecDeque<Completion>>,
    reset_lock: Mutex<()>,
    generation: AtomicU64,
    next_id: AtomicU64,
}

impl Network {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            requests: Mutex::new(VecDeque::new()),
            responses: Mutex::new(VecDeque::new()),
            reset_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
            next_id: AtomicU64::new(1),
        }
    }

    /// Queue a request for the worker and return its id
    pub fn enqueue(
        &self,
        method: Method,
        scheme: &str,
        path: &str,
        headers: Headers,
    ) -> RequestId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = HttpRequest {
            id,
            method,
            scheme: scheme.to_string(),
            path: path.to_string(),
            headers,
        };
        let generation = self.generation.load(Ordering::Acquire);
        self.requests.lock().push_back(Pending {
            request,
            generation,
        });
        id
    }

    /// Perform a request on the calling thread
    pub fn execute_now(
        &self,
        method: Method,
        scheme: &str,
        path: &str,
        headers: Headers,
    ) -> Option<HttpResponse> {
        let request = HttpRequest {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            scheme: scheme.to_string(),
            path: path.to_string(),
            headers,
        };
        self.transport.execute(&request)
    }

    /// Execute the oldest queued request; returns `false` when the queue was empty
    pub fn process_one(&self) -> bool {
        let _reset = self.reset_lock.lock();
        let Some(pending) = self.requests.lock().pop_front() else {
            return false;
        };

        let response = self.transport.execute(&pending.request);
        if pending.generation != self.generation.load(Ordering::Acquire) {
            debug!("Dropping response to request {} from a previous environment", pending.request.id);
            return true;
        }
        self.responses.lock().push_back(Completion {
            id: pending.request.id,
            response,
        });
        true
    }

    /// Take every staged completion in arrival order
    pub fn drain_responses(&self) -> Vec<Completion> {
        self.responses.lock().drain(..).collect()
    }

    pub fn pending_requests(&self) -> usize {
        self.requests.lock().len()
    }

    /// Retire every queued request and staged response, then run `rebuild`
    /// while the worker is held off.
    pub fn reset<R>(&self, rebuild: impl FnOnce() -> R) -> R {
        let _reset = self.reset_lock.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.requests.lock().clear();
        self.responses.lock().clear();
        rebuild()
    }
}
