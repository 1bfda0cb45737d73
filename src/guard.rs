//! Session-guarded navigation policies.
//!
//! A guard is a pure function of the current [`Session`]: it holds no state
//! of its own and must be re-evaluated on every session change and every
//! navigation. While the initial restore is still running both policies
//! return [`GuardDecision::ShowLoading`], which is what prevents a redirect
//! flash before the persisted user has been recovered.

use crate::session::Session;

/// Route a guarded view redirects unauthenticated visitors to.
pub const LOGIN_ROUTE: &str = "/login";

/// Route an already-authenticated visitor is sent to from anonymous-only
/// views such as the login form.
pub const DASHBOARD_ROUTE: &str = "/dashboard";

/// Outcome of evaluating a guard against the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Render the requested view.
    Admit,
    /// Navigate to the given route instead.
    Redirect(&'static str),
    /// Session restore has not finished; show a transitional state.
    ShowLoading,
}

/// A navigation policy evaluated against the session.
pub trait GuardPolicy {
    /// Decides whether the navigated view is admitted, redirected, or
    /// deferred behind a loading state.
    fn decide(&self, session: &Session) -> GuardDecision;
}

/// Admits only authenticated users; everyone else goes to the login page.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireAuth;

impl GuardPolicy for RequireAuth {
    fn decide(&self, session: &Session) -> GuardDecision {
        if session.loading {
            GuardDecision::ShowLoading
        } else if session.is_authenticated() {
            GuardDecision::Admit
        } else {
            GuardDecision::Redirect(LOGIN_ROUTE)
        }
    }
}

/// Admits only anonymous visitors; signed-in users go to their dashboard.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireAnonymous;

impl GuardPolicy for RequireAnonymous {
    fn decide(&self, session: &Session) -> GuardDecision {
        if session.loading {
            GuardDecision::ShowLoading
        } else if session.is_authenticated() {
            GuardDecision::Redirect(DASHBOARD_ROUTE)
        } else {
            GuardDecision::Admit
        }
    }
}
