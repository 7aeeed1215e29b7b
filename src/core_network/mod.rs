pub mod control;
pub mod data_channel;
pub mod network;
pub mod pasv;
pub mod peer_registry;
pub mod port;
