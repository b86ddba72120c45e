// ABOUTME: Scoped handle around a page driver that guarantees the session is released exactly once.
// ABOUTME: Explicit async close is the normal path; Drop spawns the close for cancelled or panicking runs.

use std::ops::{Deref, DerefMut};

use crate::driver::{DriverLauncher, PageDriver};
use crate::error::FetchError;

/// Owns one open driver session.
///
/// Prefer `close().await`; if the handle is dropped while still open (for
/// example because the crawl future was cancelled), the close is spawned on
/// the runtime captured at construction.
pub struct Session {
    driver: Option<Box<dyn PageDriver>>,
    label: &'static str,
    runtime_handle: tokio::runtime::Handle,
}

impl Session {
    /// Launch a new session. Must be called from within a tokio runtime.
    pub async fn open(
        launcher: &dyn DriverLauncher,
        label: &'static str,
    ) -> Result<Self, FetchError> {
        let driver = launcher.launch().await?;
        tracing::debug!(session = label, "session opened");
        Ok(Self::new(driver, label))
    }

    pub fn new(driver: Box<dyn PageDriver>, label: &'static str) -> Self {
        Self {
            driver: Some(driver),
            label,
            runtime_handle: tokio::runtime::Handle::current(),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Explicitly close the session, consuming the handle.
    pub async fn close(mut self) -> Result<(), FetchError> {
        if let Some(mut driver) = self.driver.take() {
            let result = driver.close().await;
            match &result {
                Ok(()) => tracing::debug!(session = self.label, "session closed"),
                Err(e) => tracing::warn!(session = self.label, error = %e, "session close failed"),
            }
            return result;
        }
        Ok(())
    }

    fn driver(&self) -> &(dyn PageDriver + 'static) {
        match self.driver.as_deref() {
            Some(driver) => driver,
            None => unreachable!("Session driver is only taken by close or drop"),
        }
    }

    fn driver_mut(&mut self) -> &mut (dyn PageDriver + 'static) {
        match self.driver.as_deref_mut() {
            Some(driver) => driver,
            None => unreachable!("Session driver is only taken by close or drop"),
        }
    }
}

impl Deref for Session {
    type Target = dyn PageDriver;

    fn deref(&self) -> &Self::Target {
        self.driver()
    }
}

impl DerefMut for Session {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.driver_mut()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(mut driver) = self.driver.take() {
            let label = self.label;
            self.runtime_handle.spawn(async move {
                if let Err(e) = driver.close().await {
                    tracing::warn!(session = label, error = %e, "session drop cleanup failed");
                } else {
                    tracing::trace!(session = label, "session drop cleanup succeeded");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedLauncher;
    use std::time::Duration;

    #[tokio::test]
    async fn explicit_close_releases_once() {
        let launcher = ScriptedLauncher::new();
        launcher.page("https://a.test/", "<p>a</p>");
        let mut session = Session::open(&launcher, "test").await.unwrap();
        session.navigate("https://a.test/").await.unwrap();
        session.close().await.unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(launcher.closed(), 1);
    }

    #[tokio::test]
    async fn dropped_session_is_closed_in_the_background() {
        let launcher = ScriptedLauncher::new();
        {
            let _session = Session::open(&launcher, "test").await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(launcher.launched(), 1);
        assert_eq!(launcher.closed(), 1);
    }

    #[tokio::test]
    async fn session_derefs_to_its_driver() {
        let launcher = ScriptedLauncher::new();
        launcher.page("https://a.test/", "<p>served</p>");
        let mut session = Session::open(&launcher, "test").await.unwrap();

        let driver: &mut (dyn PageDriver + 'static) = &mut *session;
        driver.navigate("https://a.test/").await.unwrap();
        assert!(session.content().await.unwrap().contains("served"));
        session.close().await.unwrap();
        assert_eq!(launcher.navigations(), vec!["https://a.test/".to_string()]);
    }

    #[tokio::test]
    async fn failed_launch_opens_nothing() {
        let launcher = ScriptedLauncher::new();
        launcher.fail_launches();
        assert!(Session::open(&launcher, "test").await.is_err());
        assert_eq!(launcher.closed(), 0);
    }
}
