//! GraphQL client and operation types.
//!
//! - [`GraphqlClient`]: Executes [`Operation`]s through the request pipeline
//! - [`Operation`]: Name, document, variables and throttling class of a call

mod client;
mod operation;

pub use client::GraphqlClient;
pub use operation::{Operation, OperationBuilder, OperationKind};
