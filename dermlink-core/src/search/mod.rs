//! Search Result Stream
//!
//! Companion stream to the image socket layer: after a search is submitted
//! over HTTP, the backend hands back a stream URL and key, and ranked
//! results arrive here as tagged JSON messages until `search_complete`.

mod message;
mod stream;

pub use message::{SearchMessage, SearchRequest};
pub use stream::{SearchEvent, SearchStream, SearchStreamConfig};
