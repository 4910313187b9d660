use tokio::sync::oneshot;
use tracing::debug;

use crate::errors::Error;
use crate::types::{Outcome, RequestDescriptor};

pub(crate) type Settled = Result<Outcome, Error>;

/// A caller suspended until the in-flight refresh settles.
pub(crate) struct QueuedRequest {
    descriptor: RequestDescriptor,
    resolver: oneshot::Sender<Settled>,
}

impl QueuedRequest {
    pub(crate) fn descriptor(&self) -> &RequestDescriptor {
        &self.descriptor
    }

    /// Consumes the entry, so each caller is resolved at most once.
    pub(crate) fn resolve(self, settled: Settled) {
        if self.resolver.send(settled).is_err() {
            debug!("queued caller went away: url='{}'", self.descriptor.url);
        }
    }
}

/// The authenticating flag and the callers parked behind it. Always accessed
/// under one lock, so checking and claiming the flag cannot interleave.
#[derive(Default)]
pub(crate) struct RequestQueue {
    authenticating: bool,
    pending: Vec<QueuedRequest>,
}

impl RequestQueue {
    pub(crate) fn is_authenticating(&self) -> bool {
        self.authenticating
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn enqueue(&mut self, descriptor: RequestDescriptor) -> oneshot::Receiver<Settled> {
        let (resolver, receiver) = oneshot::channel();
        self.pending.push(QueuedRequest {
            descriptor,
            resolver,
        });
        receiver
    }

    /// Enqueues the request and claims the refresh if no one holds it yet.
    /// The returned flag is true for the caller that must run the refresh.
    pub(crate) fn enqueue_and_claim(
        &mut self,
        descriptor: RequestDescriptor,
    ) -> (oneshot::Receiver<Settled>, bool) {
        let receiver = self.enqueue(descriptor);
        let claimed = !self.authenticating;
        self.authenticating = true;
        (receiver, claimed)
    }

    /// Ends the refresh cycle and hands back every parked caller.
    pub(crate) fn finish(&mut self) -> Vec<QueuedRequest> {
        self.authenticating = false;
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_first_claim_owns_the_refresh() {
        let mut queue = RequestQueue::default();
        let (_first, first_owns) = queue.enqueue_and_claim(RequestDescriptor::get("a"));
        let (_second, second_owns) = queue.enqueue_and_claim(RequestDescriptor::get("b"));
        assert!(first_owns);
        assert!(!second_owns);
        assert!(queue.is_authenticating());
        assert_eq!(queue.len(), 2);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn finish_resets_the_flag_and_preserves_order() {
        let mut queue = RequestQueue::default();
        let (rx, _) = queue.enqueue_and_claim(RequestDescriptor::get("a"));
        let _other = queue.enqueue(RequestDescriptor::get("b"));

        let drained = queue.finish();
        assert!(!queue.is_authenticating());
        assert_eq!(queue.len(), 0);
        let urls: Vec<_> = drained.iter().map(|q| q.descriptor().url.clone()).collect();
        assert_eq!(urls, vec!["a", "b"]);

        let mut drained = drained.into_iter();
        drained
            .next()
            .unwrap()
            .resolve(Ok(Outcome::cancelled()));
        let settled = rx.await.expect("resolved").expect("outcome");
        assert!(settled.is_error());
    }
}
