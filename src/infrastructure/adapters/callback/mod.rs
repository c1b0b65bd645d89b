//! Callback Adapter - HTTP 回调实现

mod http_callback;

pub use http_callback::HttpCallbackClient;
