pub mod helpers;
pub mod mock_graphql;
pub mod mock_rpc;
pub mod server;
