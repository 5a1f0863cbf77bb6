//! Global session factory registry
//!
//! Ensures only one `SessionFactory` exists per cluster name, so that every
//! session of a process shares one domain type handler cache. Entries are
//! weak references; a factory leaves the registry when its last reference
//! is dropped.
//!
//! Uses `parking_lot::Mutex`, which does not poison.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Weak;

use super::SessionFactory;

/// Global registry of open session factories (cluster name -> weak reference)
pub static OPEN_FACTORIES: Lazy<Mutex<HashMap<String, Weak<SessionFactory>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));
