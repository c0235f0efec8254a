//! Internal utilities.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the guard if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Serde adapter storing a [`Duration`](std::time::Duration) as whole or
/// fractional seconds.
///
/// Configuration files express timeouts and poll periods in seconds
/// (`timeout = 5`, `freq = 0.5`).
pub(crate) mod secs {
    use serde::{Deserialize, Deserializer, Serializer, de};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        if d.subsec_nanos() == 0 {
            s.serialize_u64(d.as_secs())
        } else {
            s.serialize_f64(d.as_secs_f64())
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
    struct Wrapper {
        #[serde(with = "secs")]
        d: Duration,
    }

    #[test]
    fn secs_accepts_integers_and_fractions() {
        let w: Wrapper = serde_json::from_str(r#"{"d": 5}"#).unwrap();
        assert_eq!(w.d, Duration::from_secs(5));
        let w: Wrapper = serde_json::from_str(r#"{"d": 0.25}"#).unwrap();
        assert_eq!(w.d, Duration::from_millis(250));
        assert!(serde_json::from_str::<Wrapper>(r#"{"d": -1}"#).is_err());
    }

    #[test]
    fn secs_serializes_whole_seconds_as_integer() {
        let out = serde_json::to_string(&Wrapper {
            d: Duration::from_secs(60),
        })
        .unwrap();
        assert_eq!(out, r#"{"d":60}"#);
    }

    #[test]
    fn lock_recovers_from_poison() {
        let m = std::sync::Arc::new(Mutex::new(1));
        let m2 = m.clone();
        let _ = std::thread::spawn(move || {
            let _g = m2.lock().unwrap();
            panic!("poison");
        })
        .join();
        assert!(m.is_poisoned());
        assert_eq!(*lock(&m), 1);
    }
}
