// ── Route gating ──
//
// Maps the current session state onto what a surface may render for a
// given destination. Guarded destinations require an authenticated
// session; guest-only destinations bounce an authenticated session back
// to the dashboard.

use super::SessionState;

/// A navigable destination and its access class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Guest-only: login, registration.
    Guest,
    /// Requires an authenticated session: dashboard, profile, coins.
    Guarded,
    /// No gating at all.
    Public,
}

/// What the surface should do for a destination right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Proceed to the destination.
    Render,
    /// Session verification is still in flight; show nothing yet.
    Loading,
    /// Not authenticated; go to the login surface.
    RedirectToLogin,
    /// Already authenticated on a guest-only destination; go to the
    /// dashboard.
    RedirectToDashboard,
}

/// Decide access for `route` under `state`.
///
/// While verification is pending, guarded routes hold at `Loading`
/// rather than redirecting, so a still-valid persisted session is never
/// bounced to login.
pub fn route_access(route: Route, state: SessionState) -> RouteDecision {
    match route {
        Route::Public => RouteDecision::Render,
        Route::Guarded => match state {
            SessionState::Authenticated => RouteDecision::Render,
            SessionState::Verifying => RouteDecision::Loading,
            SessionState::Unauthenticated | SessionState::Rejected => {
                RouteDecision::RedirectToLogin
            }
        },
        // A credential exists while verification is in flight, so
        // guest-only destinations bounce on `Verifying` too rather than
        // briefly showing the login surface to a logged-in user.
        Route::Guest => match state {
            SessionState::Authenticated | SessionState::Verifying => {
                RouteDecision::RedirectToDashboard
            }
            SessionState::Unauthenticated | SessionState::Rejected => RouteDecision::Render,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guarded_routes_hold_while_verifying() {
        assert_eq!(
            route_access(Route::Guarded, SessionState::Verifying),
            RouteDecision::Loading
        );
    }

    #[test]
    fn guarded_routes_redirect_unauthenticated_sessions() {
        assert_eq!(
            route_access(Route::Guarded, SessionState::Unauthenticated),
            RouteDecision::RedirectToLogin
        );
        assert_eq!(
            route_access(Route::Guarded, SessionState::Rejected),
            RouteDecision::RedirectToLogin
        );
    }

    #[test]
    fn guest_routes_bounce_authenticated_sessions() {
        assert_eq!(
            route_access(Route::Guest, SessionState::Authenticated),
            RouteDecision::RedirectToDashboard
        );
        assert_eq!(
            route_access(Route::Guest, SessionState::Rejected),
            RouteDecision::Render
        );
    }

    #[test]
    fn guest_routes_bounce_while_a_credential_is_being_verified() {
        assert_eq!(
            route_access(Route::Guest, SessionState::Verifying),
            RouteDecision::RedirectToDashboard
        );
    }

    #[test]
    fn public_routes_always_render() {
        for state in [
            SessionState::Unauthenticated,
            SessionState::Verifying,
            SessionState::Authenticated,
            SessionState::Rejected,
        ] {
            assert_eq!(route_access(Route::Public, state), RouteDecision::Render);
        }
    }
}
