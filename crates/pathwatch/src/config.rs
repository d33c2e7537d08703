#![forbid(unsafe_code)]

//! Observer and subject configuration.
//!
//! Both configs have library defaults, `with_*` builder setters, and an
//! environment overlay ([`ObserverConfig::from_env`],
//! [`SubjectConfig::from_env`]). The overlay takes a lookup function so
//! tests can supply their own environment.
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `PATHWATCH_AUTO_SUBSCRIBE` | [`ObserverConfig::auto_subscribe`] | `true` |
//! | `PATHWATCH_NOTIFY_ON_REMOVE` | [`SubjectConfig::notify_on_remove`] | `true` |
//! | `PATHWATCH_FLUSH_ON_DISPOSE` | [`SubjectConfig::flush_on_dispose`] | `true` |
//! | `PATHWATCH_REPLAY_ON_ADD` | [`SubjectConfig::replay_on_add`] | `false` |
//!
//! Values `1`, `true`, `yes`, `on` enable a flag; `0`, `false`, `no`, `off`
//! disable it. Anything else leaves the default in place.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const ENV_AUTO_SUBSCRIBE: &str = "PATHWATCH_AUTO_SUBSCRIBE";
pub const ENV_NOTIFY_ON_REMOVE: &str = "PATHWATCH_NOTIFY_ON_REMOVE";
pub const ENV_FLUSH_ON_DISPOSE: &str = "PATHWATCH_FLUSH_ON_DISPOSE";
pub const ENV_REPLAY_ON_ADD: &str = "PATHWATCH_REPLAY_ON_ADD";

#[inline]
fn env_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn overlay<F>(get_env: &F, key: &str, field: &mut bool)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(flag) = get_env(key).as_deref().and_then(env_flag) {
        *field = flag;
    }
}

/// Configuration for [`PathObserver`](crate::PathObserver) construction.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct ObserverConfig {
    /// Subscribe the chain while constructing the observer.
    pub auto_subscribe: bool,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            auto_subscribe: true,
        }
    }
}

impl ObserverConfig {
    /// Construct without subscribing; call `subscribe()` later.
    #[must_use]
    pub fn deferred() -> Self {
        Self {
            auto_subscribe: false,
        }
    }

    #[must_use]
    pub fn with_auto_subscribe(mut self, enabled: bool) -> Self {
        self.auto_subscribe = enabled;
        self
    }

    /// Defaults overlaid with the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    #[must_use]
    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        overlay(&get_env, ENV_AUTO_SUBSCRIBE, &mut config.auto_subscribe);
        config
    }
}

/// Configuration for [`PathSubject`](crate::PathSubject).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct SubjectConfig {
    /// Send one final notification to a listener when it is removed.
    pub notify_on_remove: bool,
    /// Notify every remaining listener once when the subject is disposed.
    pub flush_on_dispose: bool,
    /// Send the current value to a listener as soon as it is added.
    pub replay_on_add: bool,
}

impl Default for SubjectConfig {
    fn default() -> Self {
        Self {
            notify_on_remove: true,
            flush_on_dispose: true,
            replay_on_add: false,
        }
    }
}

impl SubjectConfig {
    #[must_use]
    pub fn with_notify_on_remove(mut self, enabled: bool) -> Self {
        self.notify_on_remove = enabled;
        self
    }

    #[must_use]
    pub fn with_flush_on_dispose(mut self, enabled: bool) -> Self {
        self.flush_on_dispose = enabled;
        self
    }

    #[must_use]
    pub fn with_replay_on_add(mut self, enabled: bool) -> Self {
        self.replay_on_add = enabled;
        self
    }

    /// Defaults overlaid with the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    #[must_use]
    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        overlay(&get_env, ENV_NOTIFY_ON_REMOVE, &mut config.notify_on_remove);
        overlay(&get_env, ENV_FLUSH_ON_DISPOSE, &mut config.flush_on_dispose);
        overlay(&get_env, ENV_REPLAY_ON_ADD, &mut config.replay_on_add);
        config
    }
}
