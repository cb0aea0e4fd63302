pub mod broadcast;
pub mod sse;

pub use broadcast::BroadcastRealtime;
pub use sse::SseRealtimeChannel;
