pub mod realtime;
pub mod reconciler;
