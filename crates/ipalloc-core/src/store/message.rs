//! Requests carried from [`super::StoreHandle`] to [`super::StoreActor`]

use tokio::sync::oneshot;

use crate::error::Result;
use crate::index::Assignment;

/// Read request: which device holds `ip`
#[derive(Debug)]
pub(crate) struct LookupRequest {
    pub ip: String,
    pub reply: oneshot::Sender<Result<String>>,
}

/// Mutating request: give `ip` to `device`
#[derive(Debug)]
pub(crate) struct AssignRequest {
    pub ip: String,
    pub device: String,
    pub reply: oneshot::Sender<Result<Assignment>>,
}

/// Either request, as picked off the channels by the actor loop
#[derive(Debug)]
pub(crate) enum Request {
    Lookup(LookupRequest),
    Assign(AssignRequest),
}
