// SPDX-License-Identifier: Apache-2.0
// Copyright NAT64 Gateway Authors

//! Priority-ordered hook traversal.

use crate::{Hook, HookContext, HookPoint, Verdict};
use tracing::{trace, warn};

/// How many times a single hook may return [`Verdict::Repeat`] for one packet
/// before the chain gives up and drops it.
const REPEAT_LIMIT: u32 = 4;

struct Registered<P> {
    priority: i32,
    hook: Box<dyn Hook<P>>,
}

/// An ordered collection of hooks per [`HookPoint`].
///
/// Hooks run in ascending priority order; hooks registered with the same
/// priority run in registration order.
pub struct HookChain<P> {
    prerouting: Vec<Registered<P>>,
    postrouting: Vec<Registered<P>>,
}

impl<P> HookChain<P> {
    /// Create an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self {
            prerouting: Vec::new(),
            postrouting: Vec::new(),
        }
    }

    /// Attach a hook at the given hook point and priority.
    pub fn register<H: Hook<P> + 'static>(&mut self, point: HookPoint, priority: i32, hook: H) {
        let list = self.list_mut(point);
        let at = list.partition_point(|r| r.priority <= priority);
        list.insert(
            at,
            Registered {
                priority,
                hook: Box::new(hook),
            },
        );
    }

    /// Number of hooks registered at a hook point.
    #[must_use]
    pub fn len(&self, point: HookPoint) -> usize {
        self.list(point).len()
    }

    /// Whether no hook is registered at a hook point.
    #[must_use]
    pub fn is_empty(&self, point: HookPoint) -> bool {
        self.list(point).is_empty()
    }

    /// Run a packet through every hook registered at `ctx.hook`.
    ///
    /// Traversal stops at the first hook that does not return
    /// [`Verdict::Accept`]: [`Verdict::Drop`], [`Verdict::Stolen`] and
    /// [`Verdict::Queue`] end the traversal with that verdict.
    /// [`Verdict::Repeat`] re-runs the same hook, up to a bound; a hook that
    /// keeps repeating gets its packet dropped.
    pub fn dispatch(&mut self, ctx: HookContext, packet: &mut P) -> Verdict {
        for registered in self.list_mut(ctx.hook) {
            let mut verdict = registered.hook.inspect(ctx, packet);
            let mut repeats = 0;
            while verdict == Verdict::Repeat {
                repeats += 1;
                if repeats > REPEAT_LIMIT {
                    warn!("hook at {} repeated {repeats} times, dropping", ctx.hook);
                    return Verdict::Drop;
                }
                verdict = registered.hook.inspect(ctx, packet);
            }
            match verdict {
                Verdict::Accept => {}
                Verdict::Drop | Verdict::Stolen | Verdict::Queue => {
                    trace!("hook at {} returned {verdict:?}", ctx.hook);
                    return verdict;
                }
                Verdict::Repeat => unreachable!(),
            }
        }
        Verdict::Accept
    }

    /// Like [`HookChain::dispatch`], but invoke `forward` if the chain
    /// accepts the packet. Returns the continuation's result, or `None` if a
    /// hook ended the traversal.
    pub fn dispatch_then<R>(
        &mut self,
        ctx: HookContext,
        packet: &mut P,
        forward: impl FnOnce(&mut P) -> R,
    ) -> Option<R> {
        match self.dispatch(ctx, packet) {
            Verdict::Accept => Some(forward(packet)),
            _ => None,
        }
    }

    fn list(&self, point: HookPoint) -> &Vec<Registered<P>> {
        match point {
            HookPoint::PreRouting => &self.prerouting,
            HookPoint::PostRouting => &self.postrouting,
        }
    }

    fn list_mut(&mut self, point: HookPoint) -> &mut Vec<Registered<P>> {
        match point {
            HookPoint::PreRouting => &mut self.prerouting,
            HookPoint::PostRouting => &mut self.postrouting,
        }
    }
}

impl<P> Default for HookChain<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Pushes a tag into the packet then returns a fixed verdict.
    struct Tag {
        tag: u8,
        verdict: Verdict,
    }

    impl Hook<Vec<u8>> for Tag {
        fn inspect(&mut self, _ctx: HookContext, packet: &mut Vec<u8>) -> Verdict {
            packet.push(self.tag);
            self.verdict
        }
    }

    /// Returns `Repeat` a given number of times, then `Accept`.
    struct Bouncer {
        remaining: u32,
    }

    impl Hook<Vec<u8>> for Bouncer {
        fn inspect(&mut self, _ctx: HookContext, packet: &mut Vec<u8>) -> Verdict {
            packet.push(0xee);
            if self.remaining == 0 {
                Verdict::Accept
            } else {
                self.remaining -= 1;
                Verdict::Repeat
            }
        }
    }

    fn ctx(point: HookPoint) -> HookContext {
        HookContext::new(point, None, None)
    }

    #[test]
    fn hooks_run_in_priority_order() {
        let mut chain = HookChain::new();
        chain.register(
            HookPoint::PreRouting,
            10,
            Tag {
                tag: 2,
                verdict: Verdict::Accept,
            },
        );
        chain.register(
            HookPoint::PreRouting,
            -5,
            Tag {
                tag: 1,
                verdict: Verdict::Accept,
            },
        );
        chain.register(
            HookPoint::PreRouting,
            10,
            Tag {
                tag: 3,
                verdict: Verdict::Accept,
            },
        );
        let mut packet = Vec::new();
        assert_eq!(
            chain.dispatch(ctx(HookPoint::PreRouting), &mut packet),
            Verdict::Accept
        );
        assert_eq!(packet, vec![1, 2, 3]);
    }

    #[test]
    fn drop_stops_traversal() {
        let mut chain = HookChain::new();
        chain.register(
            HookPoint::PostRouting,
            0,
            Tag {
                tag: 1,
                verdict: Verdict::Drop,
            },
        );
        chain.register(
            HookPoint::PostRouting,
            1,
            Tag {
                tag: 2,
                verdict: Verdict::Accept,
            },
        );
        let mut packet = Vec::new();
        assert_eq!(
            chain.dispatch(ctx(HookPoint::PostRouting), &mut packet),
            Verdict::Drop
        );
        assert_eq!(packet, vec![1]);
    }

    #[test]
    fn hook_points_are_independent() {
        let mut chain = HookChain::new();
        chain.register(
            HookPoint::PreRouting,
            0,
            Tag {
                tag: 1,
                verdict: Verdict::Stolen,
            },
        );
        let mut packet = Vec::new();
        assert_eq!(
            chain.dispatch(ctx(HookPoint::PostRouting), &mut packet),
            Verdict::Accept
        );
        assert!(packet.is_empty());
        assert!(chain.is_empty(HookPoint::PostRouting));
        assert_eq!(chain.len(HookPoint::PreRouting), 1);
    }

    #[test]
    fn repeat_reruns_the_same_hook() {
        let mut chain = HookChain::new();
        chain.register(HookPoint::PreRouting, 0, Bouncer { remaining: 2 });
        let mut packet = Vec::new();
        assert_eq!(
            chain.dispatch(ctx(HookPoint::PreRouting), &mut packet),
            Verdict::Accept
        );
        // initial run plus two repeats
        assert_eq!(packet.len(), 3);
    }

    #[test]
    fn continuation_runs_only_on_accept() {
        let mut chain = HookChain::new();
        chain.register(
            HookPoint::PreRouting,
            0,
            Tag {
                tag: 1,
                verdict: Verdict::Accept,
            },
        );
        let mut packet = Vec::new();
        let forwarded =
            chain.dispatch_then(ctx(HookPoint::PreRouting), &mut packet, |p| p.len());
        assert_eq!(forwarded, Some(1));

        chain.register(
            HookPoint::PreRouting,
            1,
            Tag {
                tag: 2,
                verdict: Verdict::Drop,
            },
        );
        let forwarded =
            chain.dispatch_then(ctx(HookPoint::PreRouting), &mut packet, |p| p.len());
        assert_eq!(forwarded, None);
    }

    #[test]
    fn unbounded_repeat_becomes_drop() {
        let mut chain = HookChain::new();
        chain.register(HookPoint::PreRouting, 0, Bouncer { remaining: u32::MAX });
        let mut packet = Vec::new();
        assert_eq!(
            chain.dispatch(ctx(HookPoint::PreRouting), &mut packet),
            Verdict::Drop
        );
    }
}
