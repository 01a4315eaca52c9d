pub mod client;
pub mod status;
pub mod storage;
pub mod realtime {
    pub mod event_stream;
    pub mod repository;
    pub mod tree;
}
