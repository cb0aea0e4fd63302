pub mod backend;
pub mod geocoding;
pub mod http;
pub mod location;
pub mod realtime;
pub mod storage;
