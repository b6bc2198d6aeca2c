mod client;

pub use client::{Credentials, IracingClient};
