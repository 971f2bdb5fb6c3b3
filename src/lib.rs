pub mod demo;
pub mod dom;
pub mod error;
pub mod event;
pub mod record;
pub mod replay;
pub mod snapshot;
pub mod timer;

#[cfg(test)]
mod test;
