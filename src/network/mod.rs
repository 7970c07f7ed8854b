// Network module - UDP ingestion of tracking-unit broadcasts

pub mod listener;

pub use listener::UdpListener;
