pub mod authenticator;
pub mod command_router;
pub mod pending_transfers;
pub mod replies;
pub mod session_store;
pub mod transfer_workflow;
pub mod wallet_api;
