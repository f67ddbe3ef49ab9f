use log::debug;
use std::sync::{Mutex, PoisonError};

use crate::error::FsError;

/// Keep the first fatal error of an operation; later ones are only logged.
pub fn record_first_error(slot: &Mutex<Option<FsError>>, err: FsError) {
    let mut first = slot.lock().unwrap_or_else(PoisonError::into_inner);
    match first.as_ref() {
        None => *first = Some(err),
        Some(_) => debug!("suppressed follow-up error: {}", err),
    }
}

/// Check operation result: if a first error was recorded, return it.
/// Call after the operation's scope has joined.
pub fn check_for_first_error(slot: &Mutex<Option<FsError>>) -> Result<(), FsError> {
    match slot.lock().unwrap_or_else(PoisonError::into_inner).take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
