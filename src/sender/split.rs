//! Fan-out to two independent stages.

use super::{Sender, TimeStamp};
use crate::error::{Error, Result};
use crate::reading::Reading;
use crate::tags::Tags;

/// Forwards every sample to two senders.
///
/// The first sender gets a copy of the tags; the second gets the original.
/// An error is returned only when both branches fail, and it carries both
/// causes.
pub struct SplitSender<A, B> {
    first: A,
    second: B,
}

impl<A: Sender, B: Sender> SplitSender<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: Sender, B: Sender> Sender for SplitSender<A, B> {
    fn send(&mut self, name: &str, tags: Tags, value: Reading, ts: TimeStamp) -> Result<()> {
        let first = self.first.send(name, tags.clone(), value.clone(), ts);
        let second = self.second.send(name, tags, value, ts);
        match (first, second) {
            (Err(first), Err(second)) => Err(Error::Split { first, second }.boxed()),
            (Err(e), Ok(())) | (Ok(()), Err(e)) => {
                tracing::debug!(target: "snmp_poller::sender::split", { error = %e, name = name }, "one split branch failed");
                Ok(())
            }
            (Ok(()), Ok(())) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sender::{Collect, FnSender};

    fn failing(msg: &'static str) -> impl Sender {
        FnSender::new(move |_: &str, _, _, _| Err(Error::config(msg)))
    }

    #[test]
    fn both_branches_receive_sample() {
        let a = Collect::new();
        let b = Collect::new();
        let mut s = SplitSender::new(a.clone(), b.clone());
        s.send("x", Tags::new(), Reading::Integer(4), TimeStamp::now()).unwrap();
        assert_eq!(a.records(), b.records());
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn one_failure_is_tolerated() {
        let b = Collect::new();
        let mut s = SplitSender::new(failing("left down"), b.clone());
        assert!(s.send("x", Tags::new(), Reading::Integer(4), TimeStamp::now()).is_ok());
        assert_eq!(b.len(), 1);

        let mut s = SplitSender::new(Collect::new(), failing("right down"));
        assert!(s.send("x", Tags::new(), Reading::Integer(4), TimeStamp::now()).is_ok());
    }

    #[test]
    fn both_failures_combine() {
        let mut s = SplitSender::new(failing("left down"), failing("right down"));
        let err = s
            .send("x", Tags::new(), Reading::Integer(4), TimeStamp::now())
            .unwrap_err();
        assert!(matches!(&*err, Error::Split { .. }));
        let msg = err.to_string();
        assert!(msg.contains("left down") && msg.contains("right down"));
    }
}
