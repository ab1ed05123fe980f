//! Guard mounts
//!
//! A mount is one protected view waiting on its guard. It exposes nothing but
//! `GuardView::Resolving` until session and role are both settled, so no
//! protected content or intermediate redirect is ever observable.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::guard::{AccessDecision, RouteGuard, RouteRequirement};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardView {
    /// Neutral loading state; protected content must not render
    Resolving,
    Render,
    /// Navigation replaces the current history entry
    Redirect { to: String, replace: bool },
}

impl From<AccessDecision> for GuardView {
    fn from(decision: AccessDecision) -> Self {
        match decision {
            AccessDecision::Allow => GuardView::Render,
            AccessDecision::RedirectTo(to) => GuardView::Redirect { to, replace: true },
        }
    }
}

pub struct GuardMount {
    view: watch::Receiver<GuardView>,
    mounted: Arc<AtomicBool>,
    task: JoinHandle<()>,
    fallback: String,
}

impl GuardMount {
    pub(crate) fn spawn(guard: RouteGuard, requirement: RouteRequirement) -> Self {
        let (tx, view) = watch::channel(GuardView::Resolving);
        let mounted = Arc::new(AtomicBool::new(true));
        let fallback = guard.config().fallback_path.clone();

        let still_mounted = mounted.clone();
        let task = tokio::spawn(async move {
            let decision = guard.check(&requirement).await;
            if still_mounted.load(Ordering::Acquire) {
                tx.send_replace(decision.into());
            } else {
                tracing::debug!(path = %requirement.path, "Guard unmounted before resolving; result discarded");
            }
        });

        Self {
            view,
            mounted,
            task,
            fallback,
        }
    }

    /// What the view may show right now
    pub fn view(&self) -> GuardView {
        self.view.borrow().clone()
    }

    pub fn is_resolving(&self) -> bool {
        *self.view.borrow() == GuardView::Resolving
    }

    /// Wait for the final view. If the resolution task died, fail closed to
    /// the fallback.
    pub async fn settled(&mut self) -> GuardView {
        match self.view.wait_for(|view| *view != GuardView::Resolving).await {
            Ok(view) => view.clone(),
            Err(_) => {
                tracing::warn!("Guard resolution ended without a decision");
                GuardView::Redirect {
                    to: self.fallback.clone(),
                    replace: true,
                }
            }
        }
    }
}

impl Drop for GuardMount {
    fn drop(&mut self) {
        self.mounted.store(false, Ordering::Release);
        self.task.abort();
    }
}
