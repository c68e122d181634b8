mod client;
mod filter;
mod history;
mod mock;
mod transport;
mod types;

pub use client::SlackClient;
pub use filter::MessageFilter;
pub use history::{History, HistoryFetcher};
pub use mock::{MockTransport, RecordedRequest};
pub use transport::{HttpResponse, ReqwestTransport, Transport, parse_retry_after};
pub use types::{ChannelId, Message, MessageTs, Page, Thread};
