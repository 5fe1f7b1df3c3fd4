//! Service layer: business rules over the repos, one module per resource.
//! Services are trust boundaries — they load their own validation data
//! rather than trusting caller-provided context.

pub mod friends;
pub mod games;
pub mod notifications;
pub mod users;
