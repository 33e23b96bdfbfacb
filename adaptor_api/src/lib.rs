// dalek Adaptor API Library
//
// HTTP front end of the adaptor: the auth middleware stamping a request
// context, the `/servers` router and the controller forwarding each verb to
// the configured compute backend.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

pub use routes::create_router;
pub use server::ApiServer;
pub use state::ApiState;
