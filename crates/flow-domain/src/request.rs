use serde::{Deserialize, Serialize};

use crate::Credentials;

/// A versioned intake payload: a credential handle plus an ordered list of
/// entries, generic over the entry kind so W-A and W-B share one shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request<E> {
    pub credentials: Credentials,
    pub entries: Vec<E>,
    #[serde(default)]
    pub headless: bool,
}

impl<E> Request<E> {
    pub fn new(credentials: Credentials, entries: Vec<E>) -> Self {
        Self { credentials, entries, headless: false }
    }
}
