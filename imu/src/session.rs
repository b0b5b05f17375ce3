use controller_traits::DeviceSession;
use std::ops::{Deref, DerefMut};
use tracing::info;

/// Owns a [`DeviceSession`] and disconnects it exactly once, either through
/// [`SessionGuard::release`] or on drop.
pub struct SessionGuard<S: DeviceSession> {
    session: S,
    released: bool,
}

impl<S: DeviceSession> SessionGuard<S> {
    pub fn new(session: S) -> Self {
        SessionGuard {
            session,
            released: false,
        }
    }

    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.session.disconnect_all();
            info!("Controller session released");
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl<S: DeviceSession> Deref for SessionGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.session
    }
}

impl<S: DeviceSession> DerefMut for SessionGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.session
    }
}

impl<S: DeviceSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        self.release();
    }
}
